//! Random run IDs.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Names each sync run with a v4 UUID.
#[derive(Default)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
