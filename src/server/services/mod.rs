pub mod edge_services;
pub mod epg_services;
pub mod relay_services;

pub use edge_services::EdgeServices;
pub use epg_services::DynEpgService;
pub use relay_services::DynRelayService;
