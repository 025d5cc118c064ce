pub mod track_local;
pub mod track_remote;
