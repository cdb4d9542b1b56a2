pub mod assets;
pub mod external_services;
pub mod response;
