//! The concrete SPEKE flavours.
//!
//! | Name | Key binds | Session | Confirmation |
//! |---|---|---|---|
//! | `jablon` | shared element only | seed | initiator first, `H(H(k))` / `H(k)` |
//! | `jablon-nokc` | shared element only | seed | none |
//! | `iso-2006` | shared element only | seed | simultaneous, label `03`/`04` |
//! | `iso-2017` | derived session | derived | initiator first, hosts bound |
//! | `iso-2017-nokc` | derived session | derived | none |
//! | `hao-shahandashti` | sorted `(host, public)` pairs | seed | simultaneous, host order swapped |
//! | `tang-mitchell` | min/max of `H(host, public)`, session | seed | initiator first, labels differ |
//! | `b-speke` | session | seed | initiator only (three messages) |

mod b_speke;
pub use b_speke::BSpeke;

mod hao_shahandashti;
pub use hao_shahandashti::HaoShahandashti;

mod iso_2006;
pub use iso_2006::Iso2006;

mod iso_2017;
pub use iso_2017::Iso2017;

mod jablon;
pub use jablon::Jablon;

mod tang_mitchell;
pub use tang_mitchell::TangMitchell;
