pub mod analytics_service;
pub mod booking_service;
pub mod catalog_service;
pub mod review_service;
pub mod schedule_service;
pub mod seed;
