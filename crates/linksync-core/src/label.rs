//! Ownership label scheme
//!
//! Every address the controller applies is stamped with a label derived
//! from the link name. When listing a link's addresses, only entries
//! whose label matches are considered controller-owned; everything else
//! belongs to other actors and is left alone.
//!
//! The kernel requires an IPv4 address label to begin with the name of
//! the interface it is bound to and caps the total at IFNAMSIZ (15
//! bytes plus NUL), which is why the label is the link name plus a
//! short fixed suffix rather than an arbitrary tag.

/// Suffix appended to a link name to form the ownership label
pub const ADDRESS_LABEL_SUFFIX: &str = "ls";

/// Return the label stamped on every address this controller assigns
/// to the named link.
///
/// Pure and deterministic: the same link name always yields the same
/// label, and distinct link names never collide (the suffix is fixed).
pub fn assigned_address_label(link_name: &str) -> String {
    format!("{link_name}{ADDRESS_LABEL_SUFFIX}")
}
