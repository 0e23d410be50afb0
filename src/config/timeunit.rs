use anyhow::anyhow;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{digit1, space0};
use nom::combinator::{all_consuming, map_res, value};
use nom::sequence::{delimited, separated_pair};
use nom::IResult;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    fn parse(input: &str) -> IResult<&str, Self> {
        alt((
            value(Self::Second, tag("seconds")),
            value(Self::Second, tag("second")),
            value(Self::Second, tag("s")),
            value(Self::Minute, tag("minutes")),
            value(Self::Minute, tag("minute")),
            value(Self::Minute, tag("m")),
            value(Self::Hour, tag("hours")),
            value(Self::Hour, tag("hour")),
            value(Self::Hour, tag("h")),
            value(Self::Day, tag("days")),
            value(Self::Day, tag("day")),
            value(Self::Day, tag("d")),
        ))(input)
    }

    fn to_duration(self, amount: u64) -> Duration {
        match self {
            Self::Second => Duration::from_secs(amount),
            Self::Minute => Duration::from_secs(amount * 60),
            Self::Hour => Duration::from_secs(amount * 60 * 60),
            Self::Day => Duration::from_secs(amount * 60 * 60 * 24),
        }
    }
}

/// Parses a human-friendly duration literal like "30 s", "10 m" or "2 hours".
pub fn parse_duration(input: &str) -> anyhow::Result<Duration> {
    let number = map_res(digit1, str::parse::<u64>);
    let amount_unit = separated_pair(number, space0, TimeUnit::parse);
    let line = delimited(space0, amount_unit, space0);

    let result = all_consuming(line)(input);
    let (amount, unit) = result
        .map_err(|e| anyhow!("Invalid duration '{}': {}", input, e))?
        .1;

    Ok(unit.to_duration(amount))
}
