pub mod epg_dto;
pub mod health_dto;
