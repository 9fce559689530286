//! Built-in topic bank so a fresh database is usable without a content file.

pub fn seed_reading_titles() -> Vec<&'static str> {
  vec![
    "The Formation of Glaciers",
    "Urban Heat Islands",
    "The Origins of Writing in Mesopotamia",
    "Coral Reef Ecosystems",
    "The Industrial Revolution and Child Labor",
    "Animal Migration and Navigation",
  ]
}

pub fn seed_speaking_themes() -> Vec<&'static str> {
  vec![
    "Education",
    "Technology in daily life",
    "Travel and culture",
    "Work and careers",
    "Health and lifestyle",
    "Environment",
  ]
}
