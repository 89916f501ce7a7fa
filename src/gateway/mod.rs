// Clients for the managed services the platform runs on

pub mod resend;
pub mod supabase;

pub use resend::ResendMailer;
pub use supabase::SupabaseDatabase;
