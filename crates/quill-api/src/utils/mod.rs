pub mod micropub_params;
pub mod ssrf_validation;
