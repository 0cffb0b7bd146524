use tracing::debug;

use wms_core::Aggregate;

/// Runs one command against a purchase/manufacturing/return order in place.
///
/// `handle` decides, then every resulting event is applied in order. The events are
/// handed back so the engine can log them once its whole operation commits; a rejected
/// command leaves the aggregate untouched.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
{
    let events = aggregate.handle(command)?;
    for event in &events {
        aggregate.apply(event);
    }
    debug!(
        aggregate = ?aggregate.id(),
        version = aggregate.version(),
        events = events.len(),
        "command executed"
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    use wms_core::AggregateRoot;

    #[derive(Debug, Default)]
    struct Bin {
        id: u32,
        version: u64,
        units: i64,
    }

    impl AggregateRoot for Bin {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    impl Aggregate for Bin {
        type Command = i64;
        type Event = i64;
        type Error = String;

        fn apply(&mut self, event: &i64) {
            self.units += event;
            self.version += 1;
        }

        fn handle(&self, command: &i64) -> Result<Vec<i64>, String> {
            if self.units + command < 0 {
                return Err(format!("only {} units left", self.units));
            }
            Ok(vec![*command])
        }
    }

    #[test]
    fn applies_decided_events() {
        let mut bin = Bin::default();
        let events = execute(&mut bin, &5).unwrap();
        assert_eq!(events, vec![5]);
        assert_eq!(bin.units, 5);
        assert_eq!(bin.version, 1);
    }

    #[test]
    fn rejected_command_leaves_state_alone() {
        let mut bin = Bin::default();
        execute(&mut bin, &2).unwrap();
        let err = execute(&mut bin, &-3).unwrap_err();
        assert_eq!(err, "only 2 units left");
        assert_eq!(bin.units, 2);
        assert_eq!(bin.version, 1);
    }
}
