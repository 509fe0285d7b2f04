mod campaign;
mod settings;
mod status;

pub mod dtos {
    pub use crate::campaign::dtos::*;
}

pub use crate::campaign::api::*;
pub use crate::settings::api::*;
pub use crate::status::api::*;
