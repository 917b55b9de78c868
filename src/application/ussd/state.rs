/// Separator the USSD gateway places between successive answers.
pub const INPUT_DELIMITER: char = '*';

/// Issue categories that ask for free-text details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    PaymentDispute,
    SystemError,
    Other,
}

impl IssueKind {
    fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "2" => Some(Self::PaymentDispute),
            "3" => Some(Self::SystemError),
            "4" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PaymentDispute => "Payment Dispute",
            Self::SystemError => "System Error",
            Self::Other => "Other",
        }
    }
}

/// Menu position derived from the full input history of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Root,
    CheckPrompt,
    CheckResult { vehicle: String },
    BookingsResult,
    IssueMenu,
    IllegalPrompt,
    IllegalResult { vehicle: String },
    IssueDetailPrompt(IssueKind),
    IssueResult { kind: IssueKind, details: String },
    StatsResult,
    Invalid,
}

/// Splits the cumulative input; an empty string means no answers yet.
pub fn tokenize(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split(INPUT_DELIMITER).collect()
    }
}

impl SessionState {
    pub fn from_input(text: &str) -> Self {
        Self::from_tokens(&tokenize(text))
    }

    pub fn from_tokens(tokens: &[&str]) -> Self {
        match tokens {
            [] => Self::Root,
            ["1"] => Self::CheckPrompt,
            ["1", vehicle] => Self::CheckResult {
                vehicle: normalize_vehicle(vehicle),
            },
            ["2"] => Self::BookingsResult,
            ["3"] => Self::IssueMenu,
            ["3", "1"] => Self::IllegalPrompt,
            ["3", "1", vehicle] => Self::IllegalResult {
                vehicle: normalize_vehicle(vehicle),
            },
            ["3", choice] => IssueKind::from_choice(choice)
                .map(Self::IssueDetailPrompt)
                .unwrap_or(Self::Invalid),
            ["3", choice, details] => IssueKind::from_choice(choice)
                .map(|kind| Self::IssueResult {
                    kind,
                    details: details.trim().to_string(),
                })
                .unwrap_or(Self::Invalid),
            ["4"] => Self::StatsResult,
            _ => Self::Invalid,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::CheckPrompt => "check_prompt",
            Self::CheckResult { .. } => "check_result",
            Self::BookingsResult => "bookings_result",
            Self::IssueMenu => "issue_menu",
            Self::IllegalPrompt => "illegal_prompt",
            Self::IllegalResult { .. } => "illegal_result",
            Self::IssueDetailPrompt(_) => "issue_detail_prompt",
            Self::IssueResult { .. } => "issue_result",
            Self::StatsResult => "stats_result",
            Self::Invalid => "invalid",
        }
    }

    /// Whether the reply for this state closes the session.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Root
                | Self::CheckPrompt
                | Self::IssueMenu
                | Self::IllegalPrompt
                | Self::IssueDetailPrompt(_)
        )
    }
}

fn normalize_vehicle(raw: &str) -> String {
    raw.trim().to_uppercase()
}
