pub mod encoding_utils;
pub mod header_utils;
pub mod playlist_utils;
pub mod relay_stream;
pub mod xmltv_utils;
