/// Symbol table for workout icon references in plan documents.
///
/// Plan JSON refers to icons by name; anything not listed here (or missing)
/// renders as the generic activity symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkoutIcon {
  Heart,
  MapPin,
  Zap,
  Clock,
  Target,
  Award,
  Trophy,
  #[default]
  Activity,
}

impl WorkoutIcon {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Heart => "heart",
      Self::MapPin => "map-pin",
      Self::Zap => "zap",
      Self::Clock => "clock",
      Self::Target => "target",
      Self::Award => "award",
      Self::Trophy => "trophy",
      Self::Activity => "activity",
    }
  }

  pub fn resolve(reference: &str) -> Self {
    match reference.trim().to_ascii_lowercase().as_str() {
      "heart" => Self::Heart,
      "map-pin" | "mappin" => Self::MapPin,
      "zap" => Self::Zap,
      "clock" => Self::Clock,
      "target" => Self::Target,
      "award" => Self::Award,
      "trophy" => Self::Trophy,
      _ => Self::Activity,
    }
  }
}

impl From<String> for WorkoutIcon {
  fn from(reference: String) -> Self {
    Self::resolve(&reference)
  }
}

impl From<WorkoutIcon> for String {
  fn from(icon: WorkoutIcon) -> Self {
    icon.as_str().to_string()
  }
}
