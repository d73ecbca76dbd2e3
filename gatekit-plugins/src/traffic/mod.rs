pub mod acl;
pub mod auth_scheme_router;
pub mod cache;
pub mod cors;
pub mod ip_restriction;
pub mod rate_limit;
