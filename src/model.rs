//! Row and attribute types for the generated funnel dataset.
//!
//! Field renames on [`EventRecord`] define the CSV header, so the column
//! order here is the column order of the output file.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// Rendering used for the `Timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ════════════════════════════════════════════════════════════════════════════
// Categorical attributes
// ════════════════════════════════════════════════════════════════════════════

/// Declares a closed set of labelled values. The label is what lands in the
/// CSV and in summary JSON keys.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

labelled_enum! {
    /// Funnel stages, in the only order a session may visit them.
    Stage {
        Browse => "Browse",
        AddToCart => "Add to Cart",
        Checkout => "Checkout",
        Purchase => "Purchase",
    }
}

labelled_enum! {
    Device {
        Mobile => "Mobile",
        Desktop => "Desktop",
        Tablet => "Tablet",
    }
}

labelled_enum! {
    Region {
        North => "North",
        South => "South",
        East => "East",
        West => "West",
    }
}

labelled_enum! {
    /// Acquisition channel of a session.
    Channel {
        GoogleAds => "Google Ads",
        Organic => "Organic",
        Email => "Email",
        SocialMedia => "Social Media",
    }
}

labelled_enum! {
    Category {
        Electronics => "Electronics",
        Fashion => "Fashion",
        Home => "Home",
        Beauty => "Beauty",
        Sports => "Sports",
    }
}

labelled_enum! {
    UserType {
        New => "New",
        Returning => "Returning",
    }
}

labelled_enum! {
    /// Whether a session left before purchasing.
    Bounce {
        Yes => "Yes",
        No => "No",
    }
}

impl Channel {
    /// Paid channels carry a per-session acquisition cost.
    pub fn is_paid(self) -> bool {
        matches!(self, Channel::GoogleAds | Channel::SocialMedia)
    }
}

impl UserType {
    pub fn for_session(session_no: usize) -> Self {
        if session_no == 1 {
            UserType::New
        } else {
            UserType::Returning
        }
    }
}

impl Bounce {
    pub fn for_outcome(completed_purchase: bool) -> Self {
        if completed_purchase {
            Bounce::No
        } else {
            Bounce::Yes
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Identifiers
// ════════════════════════════════════════════════════════════════════════════

pub fn user_id(user_no: usize) -> String {
    format!("USR{user_no:05}")
}

pub fn session_id(user_no: usize, session_no: usize) -> String {
    format!("SES{user_no:05}_{session_no}")
}

/// Round a currency amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ════════════════════════════════════════════════════════════════════════════
// Output row
// ════════════════════════════════════════════════════════════════════════════

/// One funnel event: a stage a session reached.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    #[serde(rename = "User_ID")]
    pub user_id: String,
    #[serde(rename = "Session_ID")]
    pub session_id: String,
    #[serde(rename = "Event")]
    pub event: Stage,
    #[serde(rename = "Timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Device")]
    pub device: Device,
    #[serde(rename = "Region")]
    pub region: Region,
    #[serde(rename = "Channel")]
    pub channel: Channel,
    #[serde(rename = "Product_Category")]
    pub category: Category,
    #[serde(rename = "Revenue", serialize_with = "serialize_amount")]
    pub revenue: f64,
    #[serde(rename = "Bounce_Flag")]
    pub bounce: Bounce,
    #[serde(rename = "User_Type")]
    pub user_type: UserType,
    #[serde(rename = "Is_First_Session", serialize_with = "serialize_flag")]
    pub is_first_session: bool,
    #[serde(rename = "Traffic_Cost", serialize_with = "serialize_amount")]
    pub traffic_cost: f64,
}

/// Header row of the output file, in column order.
pub const CSV_HEADER: [&str; 13] = [
    "User_ID",
    "Session_ID",
    "Event",
    "Timestamp",
    "Device",
    "Region",
    "Channel",
    "Product_Category",
    "Revenue",
    "Bounce_Flag",
    "User_Type",
    "Is_First_Session",
    "Traffic_Cost",
];

fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Float-column rendering: shortest decimal, whole values keep one
/// fractional digit (0.0 -> "0.0", 20.0 -> "20.0", 1234.50 -> "1234.5").
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        amount.to_string()
    }
}

fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_amount(*amount))
}

fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { "True" } else { "False" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_record() -> EventRecord {
        EventRecord {
            user_id: user_id(42),
            session_id: session_id(42, 2),
            event: Stage::AddToCart,
            timestamp: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(9, 5, 30)
                .unwrap(),
            device: Device::Tablet,
            region: Region::West,
            channel: Channel::SocialMedia,
            category: Category::Home,
            revenue: 0.0,
            bounce: Bounce::Yes,
            user_type: UserType::Returning,
            is_first_session: false,
            traffic_cost: 87.5,
        }
    }

    fn to_csv(records: &[EventRecord]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for r in records {
            writer.serialize(r).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn ids_are_zero_padded() {
        assert_eq!(user_id(7), "USR00007");
        assert_eq!(user_id(10000), "USR10000");
        assert_eq!(session_id(7, 3), "SES00007_3");
    }

    #[test]
    fn header_follows_field_order() {
        let csv = to_csv(&[sample_record()]);
        let header = csv.lines().next().unwrap();
        assert_eq!(header, CSV_HEADER.join(","));
    }

    #[test]
    fn row_renders_labels_and_amounts() {
        let csv = to_csv(&[sample_record()]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "USR00042,SES00042_2,Add to Cart,2024-06-01 09:05:30,Tablet,West,\
             Social Media,Home,0.0,Yes,Returning,False,87.5"
        );
    }

    #[test]
    fn purchase_row_renders_cents_and_first_session_flag() {
        let mut r = sample_record();
        r.event = Stage::Purchase;
        r.revenue = 1234.56;
        r.bounce = Bounce::No;
        r.user_type = UserType::New;
        r.is_first_session = true;
        r.channel = Channel::Organic;
        r.traffic_cost = 0.0;
        let csv = to_csv(&[r]);
        let fields: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(fields[2], "Purchase");
        assert_eq!(fields[8], "1234.56");
        assert_eq!(fields[9], "No");
        assert_eq!(fields[10], "New");
        assert_eq!(fields[11], "True");
        assert_eq!(fields[12], "0.0");
    }

    #[test]
    fn amounts_render_as_float_column() {
        assert_eq!(format_amount(0.0), "0.0");
        assert_eq!(format_amount(20.0), "20.0");
        assert_eq!(format_amount(150.0), "150.0");
        assert_eq!(format_amount(87.5), "87.5");
        assert_eq!(format_amount(1234.56), "1234.56");
    }

    #[test]
    fn only_ads_and_social_are_paid() {
        let paid: Vec<Channel> = Channel::ALL.iter().copied().filter(|c| c.is_paid()).collect();
        assert_eq!(paid, vec![Channel::GoogleAds, Channel::SocialMedia]);
    }

    #[test]
    fn stage_order_is_fixed() {
        assert_eq!(
            Stage::ALL,
            &[Stage::Browse, Stage::AddToCart, Stage::Checkout, Stage::Purchase]
        );
    }

    #[test]
    fn round_cents_keeps_two_decimals() {
        assert_eq!(round_cents(19.999), 20.0);
        assert_eq!(round_cents(123.454), 123.45);
        assert_eq!(round_cents(0.0), 0.0);
    }
}
