//! Remote side of a pane: probing a host, listing and deleting over ssh

pub mod directory;
pub mod listing;
pub mod probe;

pub use directory::RemoteDirectoryService;
pub use listing::parse_listing;
pub use probe::RemoteProbe;
