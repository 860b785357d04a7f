//! User profiles and the lookup tables for their coded fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const GENDERS: &[&str] = &["Man", "Woman", "Other"];
const BODY_TYPES: &[&str] = &[
    "Slim", "Fit", "Muscular", "Athletic", "Average", "Curvy", "Heavy",
];
const HABITS: &[&str] = &["Yes", "Sometimes", "No", "Prefer not to say"];
const TATTOOS: &[&str] = &["Many", "A Few", "None", "Prefer not to say"];
const ETHNICITIES: &[&str] = &[
    "American Indian",
    "Black/African Descent",
    "East Asian",
    "Hispanic/Latino",
    "Middle Eastern",
    "Pacific Islander",
    "South Asian",
    "White/Caucasian",
    "Other",
];
const MBTI: &[&str] = &[
    "ENFJ", "ENFP", "ENTJ", "ENTP", "ESFJ", "ESFP", "ESTJ", "ESTP", "INFJ", "INFP", "INTJ",
    "INTP", "ISFJ", "ISFP", "ISTJ", "ISTP",
];
const RELATIONSHIP_SPEEDS: &[&str] = &[
    "Gradual and Consistent",
    "Gentle Spark",
    "Harmonious Delight",
    "Engage Without Hesitation",
];
const INTERESTS: &[&str] = &[
    "Travel",
    "Hiking",
    "Yoga",
    "Photography",
    "Cooking",
    "Sports",
    "Movies",
    "Music",
    "Animals",
    "Gardening",
    "Reading",
    "Gaming",
    "Dancing",
    "Volunteering",
    "Fashion",
    "Meditation",
    "Beach",
    "Surfing",
    "Swimming",
    "Wine Tasting",
    "Painting",
    "Cycling",
    "Camping",
    "Astrology",
    "Car",
    "Magic",
    "Baking",
    "Comedy",
    "Podcasts",
    "Astronomy",
    "Pottery",
    "Sculpture",
    "Chess",
    "Coding",
    "Writing",
    "Investing",
    "Calligraphy",
    "Collecting",
    "Flowers",
    "Designing",
    "Blogging",
    "Languages",
    "Fitness",
];

/// Profile fields stored as 1-based codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// Gender
    Gender,
    /// Body type
    BodyType,
    /// Drinking habit
    Drink,
    /// Smoking habit
    Smoke,
    /// Tattoos
    Tattoo,
    /// Ethnicity
    Ethnicity,
    /// Myers-Briggs type
    Mbti,
    /// Preferred relationship pace
    RelationshipSpeed,
    /// A single interest
    Interest,
}

impl ProfileField {
    fn table(self) -> &'static [&'static str] {
        match self {
            ProfileField::Gender => GENDERS,
            ProfileField::BodyType => BODY_TYPES,
            ProfileField::Drink | ProfileField::Smoke => HABITS,
            ProfileField::Tattoo => TATTOOS,
            ProfileField::Ethnicity => ETHNICITIES,
            ProfileField::Mbti => MBTI,
            ProfileField::RelationshipSpeed => RELATIONSHIP_SPEEDS,
            ProfileField::Interest => INTERESTS,
        }
    }

    /// Label for `code`; `None` for 0 (unset) and unknown codes.
    pub fn label(self, code: u32) -> Option<&'static str> {
        let index = usize::try_from(code).ok()?.checked_sub(1)?;
        self.table().get(index).copied()
    }
}

/// Format a height in inches as feet and inches (`5'11"`).
pub fn format_height(inches: u32) -> Option<String> {
    if inches == 0 {
        return None;
    }
    Some(format!("{}'{}\"", inches / 12, inches % 12))
}

/// One picture of an album.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDetails {
    /// Blob id
    pub blob_id: String,
    /// Medium rendition
    pub medium_view_url: String,
    /// Thumbnail rendition
    pub small_view_url: String,
}

/// Free-form profile data. Album details arrive as JSON strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    /// Nanosecond timestamp of the last forced logout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_logout_ts: Option<i64>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// "About me" text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    /// Comma-separated interest codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    /// JSON object with match preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
    /// Comma-separated blob ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_album: Option<String>,
    /// JSON array of [`ImageDetails`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_album_details: Option<String>,
    /// Comma-separated blob ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_album: Option<String>,
    /// JSON array of [`ImageDetails`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_album_details: Option<String>,
    /// Blob id of the verification video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_album: Option<String>,
    /// Verification video as currently published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_album_detail: Option<String>,
    /// Verification video as uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_album_original_detail: Option<String>,
    /// Result of the last trim/rotate request, awaiting confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_album_original_edited_detail: Option<String>,
    /// 1 while a verification review is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_album_review_in_progress: Option<u8>,
    #[allow(missing_docs)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// 1 if marked as favorite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<u8>,
}

impl UserMetadata {
    /// Interest labels, skipping unknown codes.
    pub fn interest_labels(&self) -> Vec<&'static str> {
        self.interests
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .filter_map(|code| ProfileField::Interest.label(code))
            .collect()
    }

    /// Pictures of the public album. Unparseable details yield nothing.
    pub fn public_album(&self) -> Vec<ImageDetails> {
        parse_album(self.public_album_details.as_deref())
    }

    /// Pictures of the private album.
    pub fn private_album(&self) -> Vec<ImageDetails> {
        parse_album(self.private_album_details.as_deref())
    }

    /// Match preferences as JSON (an empty object when absent or invalid).
    pub fn preferences(&self) -> Value {
        self.preferences
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Whether a verification review is in progress.
    pub fn review_in_progress(&self) -> bool {
        self.verification_album_review_in_progress == Some(1)
    }
}

fn parse_album(raw: Option<&str>) -> Vec<ImageDetails> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(images) => images,
        Err(e) => {
            log::debug!("Ignoring unparseable album details: {}", e);
            Vec::new()
        }
    }
}

/// A user profile as returned by the admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub birthday: String,
    pub age: u32,
    pub gender: u32,
    /// Inches
    pub height: u32,
    pub body_type: u32,
    pub drink: u32,
    pub smoke: u32,
    pub tattoo: u32,
    pub ethnicity: u32,
    pub mbti: u32,
    pub relationship_speed: u32,
    pub is_verified: bool,
    pub is_onboarded: bool,
    pub is_hidden: bool,
    pub is_online: bool,
    pub blocked: bool,
    pub deleted: bool,
    pub last_online: String,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: UserMetadata,
}

impl User {
    /// Label for one of the coded profile fields.
    pub fn label(&self, field: ProfileField) -> Option<&'static str> {
        let code = match field {
            ProfileField::Gender => self.gender,
            ProfileField::BodyType => self.body_type,
            ProfileField::Drink => self.drink,
            ProfileField::Smoke => self.smoke,
            ProfileField::Tattoo => self.tattoo,
            ProfileField::Ethnicity => self.ethnicity,
            ProfileField::Mbti => self.mbti,
            ProfileField::RelationshipSpeed => self.relationship_speed,
            // Interests are a list; see UserMetadata::interest_labels.
            ProfileField::Interest => return None,
        };
        field.label(code)
    }

    /// First and last name when present, otherwise the username.
    pub fn display_name(&self) -> String {
        let first = self.metadata.first_name.as_deref().unwrap_or_default();
        let last = self.metadata.last_name.as_deref().unwrap_or_default();
        let full = format!("{} {}", first, last).trim().to_string();
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}
