//! Dice rolling tool

use super::{loose_integer, parse_arguments, Tool, ToolError};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;

const NAME: &str = "roll_dice";
const MAX_DICE: i64 = 100;

/// Rolls `count` dice with `sides` faces each
pub struct RollDiceTool;

#[derive(Debug, Deserialize)]
struct RollDiceInput {
    #[serde(alias = "num_dice", deserialize_with = "loose_integer")]
    count: i64,
    #[serde(alias = "num_sides", deserialize_with = "loose_integer")]
    sides: i64,
}

impl RollDiceInput {
    /// Dice count and face count, both checked positive
    fn validate(&self) -> Result<(usize, NonZeroU32), ToolError> {
        if self.count <= 0 || self.sides <= 0 {
            return Err(ToolError::invalid(
                NAME,
                "Both number of dice and sides must be positive integers.",
            ));
        }
        if self.count > MAX_DICE {
            return Err(ToolError::invalid(
                NAME,
                format!("At most {MAX_DICE} dice can be rolled at once."),
            ));
        }
        let count = usize::try_from(self.count).map_err(|e| ToolError::invalid(NAME, e.to_string()))?;
        let sides = u32::try_from(self.sides)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| ToolError::invalid(NAME, format!("Dice cannot have {} sides.", self.sides)))?;
        Ok((count, sides))
    }
}

/// Uniform rolls in `1..=sides`
pub(crate) fn roll<R: Rng + ?Sized>(count: usize, sides: NonZeroU32, rng: &mut R) -> Vec<u32> {
    (0..count).map(|_| rng.gen_range(1..=sides.get())).collect()
}

fn format_rolls(rolls: &[u32]) -> String {
    format!("Here are the results: {rolls:?}")
}

#[async_trait]
impl Tool for RollDiceTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        "Rolls a specified number of dice, each with a specified number of sides, and returns the results.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["count", "sides"],
            "properties": {
                "count": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_DICE,
                    "description": "Number of dice to roll"
                },
                "sides": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Number of sides on each die"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        let input: RollDiceInput = parse_arguments(NAME, input)?;
        let (count, sides) = input.validate()?;
        let rolls = roll(count, sides, &mut rand::thread_rng());
        Ok(format_rolls(&rolls))
    }
}
