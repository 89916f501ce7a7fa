/// Table names in the managed database
pub const BOOKINGS_TABLE: &str = "bookings";
pub const INVOICES_TABLE: &str = "invoices";
pub const USER_PREFERENCES_TABLE: &str = "user_preferences";
pub const PROFILES_TABLE: &str = "profiles";
pub const REFERRAL_CODES_TABLE: &str = "referral_codes";

/// Placeholder shown for missing location data
pub const NOT_SPECIFIED: &str = "Not specified";

// Referral codes
pub const REFERRAL_CODE_LENGTH: usize = 6;
pub const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Bulk generation gives up after this many attempts per requested code
pub const REFERRAL_ATTEMPTS_PER_CODE: usize = 3;
/// Attempts allowed when a single unique code is requested
pub const REFERRAL_SINGLE_CODE_ATTEMPTS: usize = 10;

// Query cache
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// Email
pub const RESEND_API_BASE: &str = "https://api.resend.com";
pub const DEFAULT_EMAIL_FROM: &str = "Nanny Booking <bookings@nannybooking.co.za>";

// Invoice email status values written by the functions and the webhook
pub const EMAIL_STATUS_SENT: &str = "sent";
pub const EMAIL_STATUS_DELIVERED: &str = "delivered";
pub const EMAIL_STATUS_DELAYED: &str = "delivery_delayed";
pub const EMAIL_STATUS_BOUNCED: &str = "bounced";
pub const EMAIL_STATUS_COMPLAINED: &str = "complained";
pub const EMAIL_STATUS_OPENED: &str = "opened";
pub const EMAIL_STATUS_CLICKED: &str = "clicked";
