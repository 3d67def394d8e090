//! Known issue scenarios and the heuristic classifier that detects them
//!
//! Classification is approximate: each scenario lists a few regexes that
//! are tried, in table order, against the lowercased description, and the
//! first scenario with any matching pattern wins.

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Trigger,
    Flow,
    Validation,
    Field,
    Permission,
    Formula,
    Picklist,
    Lookup,
    Layout,
    Report,
}

impl IssueType {
    pub const ALL: [IssueType; 10] = [
        Self::Trigger,
        Self::Flow,
        Self::Validation,
        Self::Field,
        Self::Permission,
        Self::Formula,
        Self::Picklist,
        Self::Lookup,
        Self::Layout,
        Self::Report,
    ];

    /// Resolve a user-supplied issue type, accepting the common aliases
    pub fn from_alias(name: &str) -> Option<Self> {
        let issue_type = match name.trim().to_lowercase().as_str() {
            "trigger" | "apex_trigger" | "apextrigger" => Self::Trigger,
            "flow" | "process_builder" | "workflow" => Self::Flow,
            "validation" | "validation_rule" | "validationrule" => Self::Validation,
            "field" | "custom_field" | "customfield" => Self::Field,
            "permission" | "profile" | "permset" | "field_security" | "license" => {
                Self::Permission
            }
            "formula" | "formula_field" => Self::Formula,
            "picklist" | "picklist_value" | "stage" => Self::Picklist,
            "lookup" | "relationship" | "master_detail" => Self::Lookup,
            "layout" | "page_layout" | "pagelayout" | "related_list" => Self::Layout,
            "report" | "report_field" => Self::Report,
            _ => return None,
        };
        Some(issue_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Flow => "flow",
            Self::Validation => "validation",
            Self::Field => "field",
            Self::Permission => "permission",
            Self::Formula => "formula",
            Self::Picklist => "picklist",
            Self::Lookup => "lookup",
            Self::Layout => "layout",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the scenario table
#[derive(Debug)]
pub struct Scenario {
    pub key: &'static str,
    pub id: u8,
    pub issue_type: IssueType,
    pub summary: &'static str,
    pub patterns: &'static [&'static str],
}

/// A scenario as reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedScenario {
    pub scenario_key: String,
    pub scenario_id: u8,
    pub issue_type: IssueType,
    pub description: String,
}

impl From<&Scenario> for DetectedScenario {
    fn from(scenario: &Scenario) -> Self {
        Self {
            scenario_key: scenario.key.to_string(),
            scenario_id: scenario.id,
            issue_type: scenario.issue_type,
            description: scenario.summary.to_string(),
        }
    }
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "trigger_field_not_updating",
        id: 1,
        issue_type: IssueType::Trigger,
        summary: "Trigger not updating a specific field",
        patterns: &[
            r"field.*not.*get.*updat",
            r"not.*updating",
            r"field.*not.*chang",
            r"trigger.*not.*set",
        ],
    },
    Scenario {
        key: "trigger_recursion",
        id: 2,
        issue_type: IssueType::Trigger,
        summary: "Trigger recursion causing infinite loop",
        patterns: &[
            r"maximum.*trigger.*depth",
            r"trigger.*depth.*exceeded",
            r"recursion",
            r"infinite.*loop",
        ],
    },
    Scenario {
        key: "soql_limit_exceeded",
        id: 3,
        issue_type: IssueType::Trigger,
        summary: "SOQL 101 limit exceeded in bulk operations",
        patterns: &[
            r"too.*many.*soql.*101",
            r"soql.*queries.*101",
            r"limit.*exception.*soql",
            r"governor.*limit.*soql",
        ],
    },
    Scenario {
        key: "flow_null_handling",
        id: 4,
        issue_type: IssueType::Flow,
        summary: "Flow fails when field is blank/null",
        patterns: &[
            r"flow.*fail.*blank",
            r"flow.*fail.*null",
            r"flow.*fail.*empty",
            r"field.*is.*blank.*flow",
        ],
    },
    Scenario {
        key: "flow_decision_wrong_value",
        id: 5,
        issue_type: IssueType::Flow,
        summary: "Flow Decision element checks wrong value",
        patterns: &[
            r"decision.*check.*instead",
            r"decision.*wrong.*value",
            r"flow.*check.*closed.*instead",
            r"decision.*element.*wrong",
        ],
    },
    Scenario {
        key: "wrong_license",
        id: 6,
        issue_type: IssueType::Permission,
        summary: "User has wrong license type",
        patterns: &[
            r"wrong.*license",
            r"unable.*access.*lead",
            r"unable.*access.*opportunit",
            r"license.*type.*wrong",
        ],
    },
    Scenario {
        key: "field_level_security",
        id: 8,
        issue_type: IssueType::Permission,
        summary: "Profile cannot access field (FLS)",
        patterns: &[
            r"cannot.*access.*field",
            r"profile.*cannot.*access",
            r"field.*not.*visible.*profile",
            r"fls.*issue",
        ],
    },
    Scenario {
        key: "formula_field_not_visible",
        id: 11,
        issue_type: IssueType::Permission,
        summary: "Formula field not visible to any profile",
        patterns: &[
            r"formula.*field.*not.*visible",
            r"formula.*not.*visible.*profile",
            r"deal.*size.*not.*visible",
        ],
    },
    Scenario {
        key: "report_field_not_visible",
        id: 22,
        issue_type: IssueType::Report,
        summary: "Field not visible in reports",
        patterns: &[
            r"report.*field.*not.*visible",
            r"field.*not.*visible.*report",
            r"rating.*not.*visible.*report",
        ],
    },
    Scenario {
        key: "wrong_layout_assignment",
        id: 7,
        issue_type: IssueType::Layout,
        summary: "Users see wrong page layout",
        patterns: &[
            r"wrong.*layout",
            r"see.*wrong.*page",
            r"should.*see.*layout",
            r"wrong.*case.*layout",
        ],
    },
    Scenario {
        key: "missing_count_related_list",
        id: 10,
        issue_type: IssueType::Layout,
        summary: "Missing count on related list",
        patterns: &[
            r"missing.*count.*opportunit",
            r"total.*count.*missing",
            r"related.*missing.*count",
        ],
    },
    Scenario {
        key: "missing_fields_related_details",
        id: 15,
        issue_type: IssueType::Layout,
        summary: "Missing fields on related details component",
        patterns: &[
            r"missing.*rating.*partner",
            r"related.*missing.*field",
            r"missing.*fields.*related",
        ],
    },
    Scenario {
        key: "missing_related_list",
        id: 18,
        issue_type: IssueType::Layout,
        summary: "Related list missing from page layout",
        patterns: &[
            r"related.*list.*missing",
            r"missing.*related.*list",
            r"stage.*history.*missing",
            r"product.*related.*list.*missing",
        ],
    },
    Scenario {
        key: "required_field_validation",
        id: 9,
        issue_type: IssueType::Validation,
        summary: "Required field validation",
        patterns: &[
            r"cannot.*saved.*without",
            r"saved.*without.*phone",
            r"require.*phone",
            r"contact.*without.*phone",
        ],
    },
    Scenario {
        key: "date_allows_past",
        id: 20,
        issue_type: IssueType::Validation,
        summary: "Date field allows past dates",
        patterns: &[
            r"allow.*past.*date",
            r"date.*allow.*past",
            r"close.*date.*past",
        ],
    },
    Scenario {
        key: "validation_too_restrictive",
        id: 21,
        issue_type: IssueType::Validation,
        summary: "Validation rule too restrictive",
        patterns: &[
            r"amount.*cannot.*exceed",
            r"validation.*too.*restrict",
            r"contact.*manager.*approval",
            r"amount.*error.*exceed",
        ],
    },
    Scenario {
        key: "missing_required_validation",
        id: 24,
        issue_type: IssueType::Validation,
        summary: "Missing required field validation",
        patterns: &[
            r"saved.*without",
            r"account.*without.*phone",
            r"no.*validation.*required",
        ],
    },
    Scenario {
        key: "unclear_validation_error",
        id: 25,
        issue_type: IssueType::Validation,
        summary: "Unclear or confusing validation error message",
        patterns: &[
            r"error.*enter.*field.*value",
            r"please.*enter.*net.*new",
            r"unclear.*validation.*error",
        ],
    },
    Scenario {
        key: "formula_calculates_incorrectly",
        id: 12,
        issue_type: IssueType::Formula,
        summary: "Formula field calculates incorrectly",
        patterns: &[
            r"formula.*calculates.*incorrect",
            r"formula.*wrong.*value",
            r"month.*formula.*invalid",
            r"formula.*return.*wrong",
        ],
    },
    Scenario {
        key: "datetime_instead_of_date",
        id: 16,
        issue_type: IssueType::Formula,
        summary: "DateTime field should display only Date",
        patterns: &[
            r"display.*date.*and.*time",
            r"should.*display.*only.*date",
            r"datetime.*instead.*date",
        ],
    },
    Scenario {
        key: "picklist_value_not_visible",
        id: 13,
        issue_type: IssueType::Picklist,
        summary: "Picklist value not visible to users",
        patterns: &[
            r"cannot.*see.*value.*picklist",
            r"picklist.*value.*not.*visible",
            r"new.*customer.*not.*visible",
            r"missing.*picklist.*value",
        ],
    },
    Scenario {
        key: "wrong_field_type_picklist",
        id: 14,
        issue_type: IssueType::Picklist,
        summary: "Wrong picklist field type",
        patterns: &[
            r"multi.*picklist.*instead.*single",
            r"displaying.*multi.*instead",
            r"wrong.*picklist.*type",
        ],
    },
    Scenario {
        key: "wrong_probability_for_stage",
        id: 19,
        issue_type: IssueType::Picklist,
        summary: "Wrong probability percentage for Opportunity stage",
        patterns: &[
            r"probability.*shows.*instead",
            r"stage.*probability.*wrong",
            r"perception.*analysis.*10.*instead.*70",
        ],
    },
    Scenario {
        key: "lookup_wrong_object",
        id: 17,
        issue_type: IssueType::Lookup,
        summary: "Lookup field shows records from wrong object",
        patterns: &[
            r"lookup.*shows.*case.*instead.*contact",
            r"lookup.*wrong.*object",
            r"lookup.*shows.*wrong.*record",
        ],
    },
];

static MATCHERS: Lazy<Vec<RegexSet>> = Lazy::new(|| {
    SCENARIOS
        .iter()
        .map(|s| RegexSet::new(s.patterns).expect("scenario patterns compile"))
        .collect()
});

/// The scenario table, in evaluation order
pub fn scenarios() -> &'static [Scenario] {
    SCENARIOS
}

/// First scenario whose patterns match `description`, if any
pub fn classify(description: &str) -> Option<&'static Scenario> {
    let text = description.to_lowercase();
    SCENARIOS
        .iter()
        .zip(MATCHERS.iter())
        .find(|(_, matcher)| matcher.is_match(&text))
        .map(|(scenario, _)| scenario)
}
