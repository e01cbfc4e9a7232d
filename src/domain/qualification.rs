//! Solar qualification quiz.

use serde::Deserialize;

/// States offered by the quiz; answers naming any other state do not qualify.
pub const ELIGIBLE_STATES: [&str; 37] = [
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Idaho",
    "Illinois",
    "Kansas",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Missouri",
    "Montana",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Puerto Rico",
    "Rhode Island",
    "South Carolina",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "Wisconsin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationAnswers {
    pub credit_score: Option<Answer>,
    pub home_ownership: Option<Answer>,
    pub state: Option<String>,
}

impl QualificationAnswers {
    /// The selected state when it is one the quiz offers.
    pub fn eligible_state(&self) -> Option<&'static str> {
        let state = self.state.as_deref()?.trim();
        ELIGIBLE_STATES
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(state))
    }

    pub fn is_qualified(&self) -> bool {
        self.credit_score == Some(Answer::Yes)
            && self.home_ownership == Some(Answer::Yes)
            && self.eligible_state().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(
        credit: Option<Answer>,
        home: Option<Answer>,
        state: Option<&str>,
    ) -> QualificationAnswers {
        QualificationAnswers {
            credit_score: credit,
            home_ownership: home,
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn only_yes_yes_and_a_listed_state_qualifies() {
        assert!(answers(Some(Answer::Yes), Some(Answer::Yes), Some("Texas")).is_qualified());
        assert!(!answers(Some(Answer::No), Some(Answer::Yes), Some("Texas")).is_qualified());
        assert!(!answers(Some(Answer::Yes), Some(Answer::No), Some("Texas")).is_qualified());
        assert!(!answers(Some(Answer::Yes), Some(Answer::Yes), None).is_qualified());
        assert!(!answers(None, Some(Answer::Yes), Some("Texas")).is_qualified());
    }

    #[test]
    fn unlisted_state_does_not_qualify() {
        assert!(!answers(Some(Answer::Yes), Some(Answer::Yes), Some("Alaska")).is_qualified());
        assert_eq!(
            answers(None, None, Some(" new york ")).eligible_state(),
            Some("New York")
        );
    }

    #[test]
    fn answers_deserialize_from_form_values() {
        let parsed: QualificationAnswers =
            serde_json::from_str(r#"{"creditScore":"yes","homeOwnership":"no","state":"Ohio"}"#)
                .expect("parses");
        assert_eq!(parsed.credit_score, Some(Answer::Yes));
        assert_eq!(parsed.home_ownership, Some(Answer::No));
    }
}
