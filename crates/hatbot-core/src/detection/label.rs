use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector labels that get a hat.
///
/// Labels are matched exactly as the detector spells them. Anything else is
/// dropped before geometry is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimalClass {
    Dog,
    Cat,
    Parrot,
    Hamster,
    Duck,
    Animal,
}

impl AnimalClass {
    pub const ALL: [AnimalClass; 6] = [
        AnimalClass::Dog,
        AnimalClass::Cat,
        AnimalClass::Parrot,
        AnimalClass::Hamster,
        AnimalClass::Duck,
        AnimalClass::Animal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnimalClass::Dog => "Dog",
            AnimalClass::Cat => "Cat",
            AnimalClass::Parrot => "Parrot",
            AnimalClass::Hamster => "Hamster",
            AnimalClass::Duck => "Duck",
            AnimalClass::Animal => "Animal",
        }
    }

    /// Look up a detector label, `None` if it is not an animal we handle.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.name() == label)
    }
}

impl fmt::Display for AnimalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_class_is_found_by_its_label() {
        for class in AnimalClass::ALL {
            assert_eq!(AnimalClass::from_label(class.name()), Some(class));
            assert_eq!(class.to_string(), class.name());
        }
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        assert_eq!(AnimalClass::from_label("dog"), None);
        assert_eq!(AnimalClass::from_label("Person"), None);
        assert_eq!(AnimalClass::from_label("Bird"), None);
    }
}
