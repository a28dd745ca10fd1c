//! Line-oriented ASCII map format.
//!
//! ```text
//! #X 0                ; maximum row coordinate
//! #Y 2                ; maximum column coordinate
//! #P 0 0 0 D 0 2 50   ; package at (0,0) from time 0, deliver to (0,2) before time 50
//! #B 0 0 1 0          ; always blocked edge
//! #F 0 1 0 2 0.3      ; fragile edge blocked with probability 0.3
//! #A 0 0              ; agent at (0,0)
//! ```
//!
//! Lines with an unknown or missing tag are skipped, as is anything after `;`.
//! Validation of the parsed contents is left to [`World::new`](crate::world::World::new).

use std::str::{FromStr, SplitWhitespace};

use crate::error::{NavError, NavResult};
use crate::types::{Pos, SpecialEdge};
use crate::world::{MapDescription, PackageSpec};

pub fn parse_map(input: &str) -> NavResult<MapDescription> {
    let mut map = MapDescription::default();
    for (idx, raw) in input.lines().enumerate() {
        let content = raw.split(';').next().unwrap_or_default();
        let mut fields = Fields { line: idx + 1, tokens: content.split_whitespace() };
        let Some(tag) = fields.tokens.next() else {
            continue;
        };
        match tag {
            "#X" => map.rows = fields.extent()?,
            "#Y" => map.cols = fields.extent()?,
            "#P" => {
                let pickup = fields.pos()?;
                let appears_at = fields.number("appearance time")?;
                // Field 4 is a `D` marker and is not checked.
                fields.token("delivery marker")?;
                let deliver_to = fields.pos()?;
                let deadline = fields.number("deadline")?;
                map.packages.push(PackageSpec { pickup, appears_at, deliver_to, deadline });
            }
            "#B" => {
                let (from, to) = (fields.pos()?, fields.pos()?);
                map.edges.push(SpecialEdge::always_blocked(from, to));
            }
            "#F" => {
                let (from, to) = (fields.pos()?, fields.pos()?);
                let probability = fields.number("blocking probability")?;
                map.edges.push(SpecialEdge::fragile(from, to, probability));
            }
            "#A" => map.agents.push(fields.pos()?),
            _ => log::debug!("skipping line {}: unknown tag `{tag}`", idx + 1),
        }
    }
    Ok(map)
}

struct Fields<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn token(&mut self, what: &str) -> NavResult<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| NavError::Parse { line: self.line, message: format!("missing {what}") })
    }

    fn number<T: FromStr>(&mut self, what: &str) -> NavResult<T> {
        let token = self.token(what)?;
        token.parse().map_err(|_| NavError::Parse {
            line: self.line,
            message: format!("invalid {what} `{token}`"),
        })
    }

    fn pos(&mut self) -> NavResult<Pos> {
        Ok(Pos::new(self.number("row")?, self.number("column")?))
    }

    /// Maximum coordinate on the line; the extent is one more.
    fn extent(&mut self) -> NavResult<usize> {
        let max: usize = self.number("maximum coordinate")?;
        max.checked_add(1).ok_or_else(|| NavError::Parse {
            line: self.line,
            message: format!("maximum coordinate `{max}` is too large"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpecialKind;
    use crate::world::World;

    const SAMPLE: &str = "\
; delivery across a fragile edge
#X 1 ; Maximum x coordinate
#Y 2
#P 0 0 0 D 0 2 50
#B 1 0 1 1
#F 0 1 0 2 0.3
#A 0 0
#Q ignored
";

    #[test]
    fn parses_every_tag() {
        let map = parse_map(SAMPLE).unwrap();
        assert_eq!((map.rows, map.cols), (2, 3));
        assert_eq!(
            map.packages,
            [PackageSpec {
                pickup: Pos::new(0, 0),
                appears_at: 0,
                deliver_to: Pos::new(0, 2),
                deadline: 50,
            }]
        );
        assert_eq!(map.agents, [Pos::new(0, 0)]);
        assert_eq!(map.edges.len(), 2);
        assert_eq!(map.edges[0].kind, SpecialKind::AlwaysBlocked);
        assert_eq!(map.edges[1].kind, SpecialKind::Fragile { probability: 0.3 });
        assert_eq!(map.edges[1].identifier(), "(0,1) (0,2)");
    }

    #[test]
    fn malformed_numbers_report_their_line() {
        let err = parse_map("#X 1\n#Y 1\n#F 0 0 0 x 0.5\n").unwrap_err();
        assert_eq!(err, NavError::Parse { line: 3, message: "invalid column `x`".to_string() });

        let err = parse_map("#A 0\n").unwrap_err();
        assert_eq!(err, NavError::Parse { line: 1, message: "missing column".to_string() });

        assert!(matches!(parse_map("#X -1\n"), Err(NavError::Parse { line: 1, .. })));
    }

    #[test]
    fn huge_extents_are_rejected_without_overflow() {
        let err = parse_map("#X 1\n#Y 18446744073709551615\n").unwrap_err();
        assert_eq!(
            err,
            NavError::Parse {
                line: 2,
                message: "maximum coordinate `18446744073709551615` is too large".to_string(),
            }
        );

        let map = parse_map("#X 99998\n#Y 99998\n#P 0 0 0 D 0 1 9\n#A 0 0\n").unwrap();
        assert!(matches!(World::new(&map), Err(NavError::Validation(_))));
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let map = parse_map("\n   \n; only a comment\n").unwrap();
        assert_eq!(map, MapDescription::default());
    }
}
