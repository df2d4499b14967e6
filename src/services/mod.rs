pub(crate) mod contact_links;
pub(crate) mod enrollment;
pub(crate) mod forum_threads;
pub(crate) mod route_guard;
pub(crate) mod storage;
pub(crate) mod subscription;
