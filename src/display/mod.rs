// Display-oriented reshaping of database rows

pub mod currency;
pub mod home_size;
pub mod location;

pub use currency::{format_currency, format_date};
pub use home_size::{
    get_home_size_display_name, get_home_size_full_description, is_valid_home_size, HomeSize,
};
pub use location::{format_location, format_location_value};
