//! Arena handles for nodes and edges.
//!
//! The original design threads `shared_ptr<KDTreeNode>`/`shared_ptr<Edge>`
//! everywhere, including in back-references (parent <-> successor list),
//! which is a reference cycle a strict-ownership language can't express
//! directly. Per the design notes (`spec.md` §9) this crate instead stores
//! nodes and edges in arenas and refers to them by stable typed index.

index_vec::define_index_type! {
    /// Index into a `KdTree`'s node arena.
    pub struct NodeId = usize;
}

index_vec::define_index_type! {
    /// Index into an `EdgeArena`.
    pub struct EdgeId = usize;
}
