//! The fixed questionnaire.

/// One questionnaire entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    /// Position in the questionnaire, starting at 0.
    pub ordinal: usize,
    /// Label used when the answer is embedded in the plan prompt.
    pub label: &'static str,
    /// Text spoken/shown to the user.
    pub text: &'static str,
}

/// Number of questions in the questionnaire.
pub const QUESTION_COUNT: usize = 8;

/// The questionnaire, in the order it is asked.
pub static QUESTIONS: [Question; QUESTION_COUNT] = [
    Question {
        ordinal: 0,
        label: "Primary Goal",
        text: "What is your primary fitness goal? For example, lose weight, build muscle, improve endurance, or general fitness",
    },
    Question {
        ordinal: 1,
        label: "Fitness Level",
        text: "What is your current fitness level? Beginner, intermediate, or advanced",
    },
    Question {
        ordinal: 2,
        label: "Days per Week",
        text: "How many days per week can you commit to working out?",
    },
    Question {
        ordinal: 3,
        label: "Location",
        text: "Do you have access to a gym, or will you be working out at home?",
    },
    Question {
        ordinal: 4,
        label: "Equipment",
        text: "What equipment do you have available? For example, dumbbells, resistance bands, or none",
    },
    Question {
        ordinal: 5,
        label: "Injuries/Limitations",
        text: "Do you have any injuries or physical limitations I should know about?",
    },
    Question {
        ordinal: 6,
        label: "Age/Gender",
        text: "What is your age and gender? This helps me tailor the program",
    },
    Question {
        ordinal: 7,
        label: "Dietary Preferences",
        text: "What are your dietary preferences? For example, vegetarian, vegan, or no restrictions",
    },
];

/// Question at `index`, if any.
pub fn question(index: usize) -> Option<&'static Question> {
    QUESTIONS.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_match_positions() {
        for (i, q) in QUESTIONS.iter().enumerate() {
            assert_eq!(q.ordinal, i);
            assert!(!q.text.is_empty());
        }
    }

    #[test]
    fn out_of_range_is_none() {
        assert!(question(QUESTION_COUNT).is_none());
        assert_eq!(question(0).unwrap().label, "Primary Goal");
    }
}
