pub(crate) use self::ccd_solver::{
    find_first_impact, is_colliding, island_needs_ccd, update_contacts,
};
pub use self::contact_handler::ContactHandler;

mod ccd_solver;
mod contact_handler;
