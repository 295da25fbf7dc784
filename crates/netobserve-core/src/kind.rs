/// Total order over resource kinds: `Service < Controller < Pod`.
///
/// [`crate::SelectorIndex::match_resources`] uses this ordering to decide
/// whether the query resource is the coarser "parent" selector or the finer
/// "child" label set (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// A service, selecting pods by label.
    Service,
    /// A deployment, stateful set, or daemon set, selecting pods by label.
    Controller,
    /// A pod, the finest-grained resource, carrying labels rather than a
    /// selector.
    Pod,
}
