//! Water: a reference configuration of the engine.
//!
//! Three states, `Solid`, `Liquid` and `Gas`, derived from the temperature:
//! below 0 is solid, 0 to 100 inclusive is liquid, above 100 is gas. The
//! temperature can never go below -273. Entering a state rescales the
//! volume: doubled when freezing, tripled when boiling, and divided back
//! when returning to liquid.

use crate::builder::BuildError;
use crate::config::PropertyConfig;
use crate::core::{
    Entity, Hooks, Property, PropertyTransactionList, StateId, StateMachine, Subject, Value,
    ValueKind,
};
use crate::error::{Error, Result, TransitionError};
use std::sync::Arc;

pub const SOLID: &str = "Solid";
pub const LIQUID: &str = "Liquid";
pub const GAS: &str = "Gas";

pub const TEMPERATURE: &str = "temperatureC";
pub const VOLUME: &str = "volume";

const ABSOLUTE_ZERO: f64 = -273.0;

/// Phase implied by a temperature in Celsius.
pub fn phase_for(celsius: f64) -> &'static str {
    if celsius < 0.0 {
        SOLID
    } else if celsius <= 100.0 {
        LIQUID
    } else {
        GAS
    }
}

/// The water state machine. Every state carries [`PhaseHooks`].
pub fn machine() -> Result<Arc<StateMachine>> {
    crate::state_machine! {
        hooks: PhaseHooks;
        Solid => [Liquid],
        Liquid => [Gas, Solid],
        Gas => [Liquid],
    }
}

/// A liquid body of water at 25 degrees with a volume of 10.
pub fn water(machine: Arc<StateMachine>) -> Result<Entity> {
    let temperature = TemperatureHooks::new(&machine)?;
    let liquid = find(&machine, LIQUID)?;
    Entity::new(
        "Water",
        machine,
        liquid,
        &[
            PropertyConfig::new(TEMPERATURE, "number")
                .initial(25)
                .hooks(temperature),
            PropertyConfig::new(VOLUME, "number").initial(10),
        ],
    )
}

/// Lower the temperature by `celsius` in one transaction.
pub fn freeze(water: &mut Entity, celsius: f64) -> Result<()> {
    let current = temperature(water)?;
    water.write(TEMPERATURE, current - celsius)
}

/// Raise the temperature by `celsius` in one transaction.
pub fn warm(water: &mut Entity, celsius: f64) -> Result<()> {
    let current = temperature(water)?;
    water.write(TEMPERATURE, current + celsius)
}

pub fn temperature(water: &Entity) -> Result<f64> {
    float(water, TEMPERATURE)
}

pub fn volume(water: &Entity) -> Result<f64> {
    float(water, VOLUME)
}

fn float(entity: &Entity, name: &str) -> Result<f64> {
    let value = entity.get(name)?;
    value.as_f64().ok_or_else(|| Error::TypeMismatch {
        property: name.to_string(),
        expected: ValueKind::Float,
        found: value.kind(),
    })
}

fn find(machine: &StateMachine, name: &str) -> Result<StateId> {
    machine
        .find(name)
        .ok_or_else(|| BuildError::MissingState(name.to_string()).into())
}

/// Temperature rules: absolute zero floor and phase derivation.
pub struct TemperatureHooks {
    solid: StateId,
    liquid: StateId,
    gas: StateId,
}

impl TemperatureHooks {
    pub fn new(machine: &StateMachine) -> Result<Self> {
        Ok(Self {
            solid: find(machine, SOLID)?,
            liquid: find(machine, LIQUID)?,
            gas: find(machine, GAS)?,
        })
    }
}

impl Hooks for TemperatureHooks {
    fn derive_next_state(&self, _entity: &Entity, property: &Property) -> Result<Option<StateId>> {
        if property.name() != TEMPERATURE {
            return Err(Error::domain(format!(
                "temperature rules attached to '{}'",
                property.name()
            )));
        }
        let celsius = property.get_value()?.as_f64().unwrap_or_default();
        let next = match phase_for(celsius) {
            SOLID => self.solid,
            LIQUID => self.liquid,
            _ => self.gas,
        };
        Ok(Some(next))
    }

    fn validate_change(&self, _entity: &Entity, _subject: Subject<'_>, candidate: &Value) -> Result<()> {
        match candidate.as_f64() {
            Some(celsius) if celsius < ABSOLUTE_ZERO => {
                Err(Error::domain("Temperature can't go below absolute zero!"))
            }
            _ => Ok(()),
        }
    }
}

/// State rules shared by the three phases.
pub struct PhaseHooks;

impl Hooks for PhaseHooks {
    /// The proposed phase must agree with the current temperature.
    fn validate_change(&self, entity: &Entity, subject: Subject<'_>, candidate: &Value) -> Result<()> {
        let celsius = temperature(entity)?;
        let proposed = candidate.as_str().unwrap_or_default();
        if proposed != phase_for(celsius) {
            return Err(TransitionError::NotPermitted {
                from: subject.name().to_string(),
                to: proposed.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Rescale the volume after a temperature-driven phase change.
    fn after_change(
        &self,
        entity: &mut Entity,
        subject: Subject<'_>,
        ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        let Some(previous) = subject.as_state() else {
            return Ok(());
        };
        let triggered_by_temperature = ledger
            .last_property_transaction()
            .is_some_and(|transaction| transaction.property_name() == TEMPERATURE);
        if !triggered_by_temperature {
            return Ok(());
        }

        let current = volume(entity)?;
        let rescaled = match entity.get_state() {
            GAS => current * 3.0,
            SOLID => current * 2.0,
            _ if previous.name() == GAS => current / 3.0,
            _ => current / 2.0,
        };
        entity.set_value(VOLUME, rescaled, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        assert_eq!(phase_for(-0.5), SOLID);
        assert_eq!(phase_for(0.0), LIQUID);
        assert_eq!(phase_for(100.0), LIQUID);
        assert_eq!(phase_for(100.5), GAS);
    }

    #[test]
    fn water_starts_liquid() {
        let water = water(machine().unwrap()).unwrap();

        assert_eq!(water.get_state(), LIQUID);
        assert_eq!(temperature(&water).unwrap(), 25.0);
        assert_eq!(volume(&water).unwrap(), 10.0);
    }

    #[test]
    fn absolute_zero_is_a_floor() {
        let mut water = water(machine().unwrap()).unwrap();

        let err = freeze(&mut water, 400.0).unwrap_err();

        assert!(matches!(err, Error::Domain(_)));
        assert_eq!(temperature(&water).unwrap(), 25.0);
        assert_eq!(water.get_state(), LIQUID);
    }

    #[test]
    fn dump_lists_state_and_properties() {
        let water = water(machine().unwrap()).unwrap();
        assert_eq!(
            water.to_string(),
            "Water - In Liquid\n  * temperatureC - 25\n  * volume - 10"
        );
    }

    #[test]
    fn phase_hooks_reject_inconsistent_state() {
        let machine = machine().unwrap();
        let water = water(Arc::clone(&machine)).unwrap();
        let liquid = &machine[machine.find(LIQUID).unwrap()];

        let result = PhaseHooks.validate_change(&water, Subject::State(liquid), &Value::from(GAS));

        assert!(matches!(result, Err(Error::Transition(_))));
    }
}
