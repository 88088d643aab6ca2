//! Regions and countries in which plants operate.
//!
//! TCO and abatement reference data are keyed by country, whereas steel demand and regional
//! resource budgets are keyed by region.
use crate::id::define_id_type;

define_id_type! {RegionID}
define_id_type! {CountryID}
