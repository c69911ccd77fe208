pub mod audit;
pub mod notes;
pub mod tenants;
pub mod users;
