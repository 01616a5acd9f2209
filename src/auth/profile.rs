//! Normalized user profiles and the field mapping applied to raw Mail.ru payloads.

// self
use crate::_prelude::*;

/// Portable profile fields the normalizer knows how to populate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
	/// `uid`.
	///
	/// Only affects [`Profile::normalize`]; Mail.ru profiles always carry it.
	Id,
	/// `first_name` + `last_name`.
	///
	/// Only affects [`Profile::normalize`]; Mail.ru profiles always carry it.
	DisplayName,
	/// `nick`.
	Username,
	/// Structured `first_name`/`last_name`.
	Name,
	/// `sex` (0 = male, 1 = female).
	Gender,
	/// `email`.
	Emails,
	/// `pic_big`, `pic`, `pic_small`.
	Photos,
	/// `link`.
	ProfileUrl,
	/// `birthday` (`dd.mm.yyyy`).
	Birthday,
	/// `location.city` / `location.region` / `location.country` names.
	Location,
}
impl ProfileField {
	/// Field set used when no explicit list is configured.
	pub const DEFAULT: [ProfileField; 10] = [
		ProfileField::Id,
		ProfileField::DisplayName,
		ProfileField::Username,
		ProfileField::Name,
		ProfileField::Gender,
		ProfileField::Emails,
		ProfileField::Photos,
		ProfileField::ProfileUrl,
		ProfileField::Birthday,
		ProfileField::Location,
	];

	/// Returns the stable snake_case label for the field.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProfileField::Id => "id",
			ProfileField::DisplayName => "display_name",
			ProfileField::Username => "username",
			ProfileField::Name => "name",
			ProfileField::Gender => "gender",
			ProfileField::Emails => "emails",
			ProfileField::Photos => "photos",
			ProfileField::ProfileUrl => "profile_url",
			ProfileField::Birthday => "birthday",
			ProfileField::Location => "location",
		}
	}
}
impl Display for ProfileField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProfileField {
	type Err = UnknownProfileField;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::DEFAULT
			.into_iter()
			.find(|field| field.as_str() == s)
			.ok_or_else(|| UnknownProfileField { field: s.to_owned() })
	}
}

/// Error returned when a profile field name is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown profile field: {field}.")]
pub struct UnknownProfileField {
	/// The unrecognized name.
	pub field: String,
}

/// Gender reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
	/// `sex == 0`.
	Male,
	/// `sex == 1`.
	Female,
}

/// Structured name parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileName {
	/// Last name.
	pub family_name: Option<String>,
	/// First name.
	pub given_name: Option<String>,
}

/// Typed value entry (emails, photos).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileValue {
	/// The address or URL.
	pub value: String,
	/// Optional label (e.g. the photo size key).
	#[serde(rename = "type")]
	pub kind: Option<String>,
}

/// Provider-agnostic user profile handed to the host verify callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	/// Identifier of the provider that produced the profile.
	pub provider: String,
	/// Provider-unique user identifier.
	pub id: String,
	/// Human-readable name.
	pub display_name: String,
	/// Nickname.
	pub username: Option<String>,
	/// Structured name.
	pub name: Option<ProfileName>,
	/// Gender.
	pub gender: Option<Gender>,
	/// Email addresses.
	pub emails: Vec<ProfileValue>,
	/// Avatar URLs, largest first.
	pub photos: Vec<ProfileValue>,
	/// Public profile page.
	pub profile_url: Option<String>,
	/// Birthday as reported by the provider.
	pub birthday: Option<String>,
	/// Human-readable location (`city, region, country`).
	pub location: Option<String>,
	/// Raw response body.
	pub raw: String,
	/// Parsed profile object.
	pub json: JsonMap<String, JsonValue>,
}
impl Profile {
	/// Maps a raw profile object into a [`Profile`], copying only the requested fields.
	///
	/// `raw` and `json` are left empty; callers attach the response they parsed.
	pub fn normalize(
		provider: &str,
		json: &JsonMap<String, JsonValue>,
		fields: &[ProfileField],
	) -> Self {
		let wants = |field: ProfileField| fields.contains(&field);
		let first_name = text(json, "first_name");
		let last_name = text(json, "last_name");
		let mut profile = Self {
			provider: provider.to_owned(),
			id: String::new(),
			display_name: String::new(),
			username: None,
			name: None,
			gender: None,
			emails: Vec::new(),
			photos: Vec::new(),
			profile_url: None,
			birthday: None,
			location: None,
			raw: String::new(),
			json: JsonMap::new(),
		};

		if wants(ProfileField::Id) {
			profile.id = text(json, "uid").unwrap_or_default();
		}
		if wants(ProfileField::DisplayName) {
			profile.display_name = join_name(first_name.as_deref(), last_name.as_deref());
		}
		if wants(ProfileField::Username) {
			profile.username = text(json, "nick");
		}
		if wants(ProfileField::Name) && (first_name.is_some() || last_name.is_some()) {
			profile.name = Some(ProfileName { family_name: last_name, given_name: first_name });
		}
		if wants(ProfileField::Gender) {
			profile.gender = match json.get("sex").and_then(number) {
				Some(0) => Some(Gender::Male),
				Some(1) => Some(Gender::Female),
				_ => None,
			};
		}
		if wants(ProfileField::Emails) {
			profile.emails = text(json, "email")
				.map(|value| ProfileValue { value, kind: None })
				.into_iter()
				.collect();
		}
		if wants(ProfileField::Photos) {
			profile.photos = ["pic_big", "pic", "pic_small"]
				.into_iter()
				.filter_map(|key| {
					text(json, key).map(|value| ProfileValue { value, kind: Some(key.into()) })
				})
				.collect();
		}
		if wants(ProfileField::ProfileUrl) {
			profile.profile_url = text(json, "link");
		}
		if wants(ProfileField::Birthday) {
			profile.birthday = text(json, "birthday");
		}
		if wants(ProfileField::Location) {
			profile.location = location(json);
		}

		profile
	}
}

/// Joins first and last name with a single space, skipping missing parts.
pub(crate) fn join_name(first: Option<&str>, last: Option<&str>) -> String {
	let name = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());

	name.trim().to_owned()
}

/// Reads a string field, accepting numbers for identifiers like `uid`.
pub(crate) fn text(json: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
	match json.get(key)? {
		JsonValue::String(value) if !value.is_empty() => Some(value.clone()),
		JsonValue::Number(value) => Some(value.to_string()),
		_ => None,
	}
}

fn number(value: &JsonValue) -> Option<i64> {
	match value {
		JsonValue::Number(value) => value.as_i64(),
		JsonValue::String(value) => value.parse().ok(),
		_ => None,
	}
}

fn location(json: &JsonMap<String, JsonValue>) -> Option<String> {
	let location = json.get("location")?.as_object()?;
	let parts = ["city", "region", "country"]
		.into_iter()
		.filter_map(|key| location.get(key)?.as_object())
		.filter_map(|part| text(part, "name"))
		.collect::<Vec<_>>();

	if parts.is_empty() { None } else { Some(parts.join(", ")) }
}
