pub mod catalog_service;
pub mod enrollment_service;
pub mod identity_service;
pub mod mail_service;
pub mod progress_service;
pub mod rating_service;
