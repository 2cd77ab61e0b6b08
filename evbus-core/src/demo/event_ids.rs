use crate::registry::EventId;

/// Event channels used by the demo behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventIds {
    Test1 = 0,
    Test2 = 1,
}

impl From<EventIds> for EventId {
    fn from(id: EventIds) -> Self {
        id as EventId
    }
}

impl TryFrom<EventId> for EventIds {
    type Error = EventId;

    fn try_from(id: EventId) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Test1),
            1 => Ok(Self::Test2),
            other => Err(other),
        }
    }
}

/// Payload carried by [`EventIds::Test1`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamTest {
    pub id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversions() {
        assert_eq!(EventId::from(EventIds::Test1), 0);
        assert_eq!(EventId::from(EventIds::Test2), 1);
        assert_eq!(EventIds::try_from(1), Ok(EventIds::Test2));
        assert_eq!(EventIds::try_from(9), Err(9));
    }
}
