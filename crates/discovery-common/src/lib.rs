pub mod api;
pub mod error;
pub mod redis;
pub mod seed;
pub mod supabase;
