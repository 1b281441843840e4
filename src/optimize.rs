use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::inst::{Dir, Inst};
use crate::source::SourceProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// One opcode per source symbol.
    None,
    /// Run-length compression only.
    Basic,
    /// Idiom fusion plus run-length compression.
    #[default]
    Heavy,
}

impl FromStr for OptLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OptLevel::None),
            "basic" => Ok(OptLevel::Basic),
            "heavy" => Ok(OptLevel::Heavy),
            other => Err(format!(
                "unknown optimization level {other:?} (expected none, basic, or heavy)"
            )),
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptLevel::None => "none",
            OptLevel::Basic => "basic",
            OptLevel::Heavy => "heavy",
        };
        write!(f, "{name}")
    }
}

/// Rewrite a source program into an opcode stream of equivalent effect.
///
/// The heavy level applies the passes in fixed order: move fusion, zero
/// fusion, copy fusion, run-length compression. Each pass is a single
/// traversal; a loop fused by one pass is never re-scanned by a later one.
pub fn optimize(prog: &SourceProgram, level: OptLevel) -> Vec<Inst> {
    let code = lower(prog);
    match level {
        OptLevel::None => code,
        OptLevel::Basic => compress(code),
        OptLevel::Heavy => {
            let code = fold_loops(code, match_move);
            let code = fold_loops(code, match_zero);
            let code = fold_loops(code, match_copy);
            compress(code)
        }
    }
}

fn lower(prog: &SourceProgram) -> Vec<Inst> {
    prog.symbols()
        .iter()
        .map(|b| match b {
            b'+' => Inst::Inc(1),
            b'-' => Inst::Dec(1),
            b'>' => Inst::Right(1),
            b'<' => Inst::Left(1),
            b'[' => Inst::Open,
            b']' => Inst::Close,
            b'.' => Inst::Output,
            b',' => Inst::Input,
            _ => unreachable!(),
        })
        .collect()
}

fn is_step(inst: &Inst) -> bool {
    matches!(inst, Inst::Inc(1) | Inst::Dec(1) | Inst::Right(1) | Inst::Left(1))
}

/// Single traversal replacing every innermost bracket loop whose body the
/// matcher recognizes. Bodies containing anything but bare steps are never
/// candidates, so brackets left behind by an earlier pass stay untouched.
fn fold_loops<F>(prog: Vec<Inst>, matcher: F) -> Vec<Inst>
where
    F: Fn(&[Inst]) -> Option<Inst>,
{
    let mut out: Vec<Inst> = Vec::with_capacity(prog.len());
    let mut opens: Vec<usize> = Vec::new();
    for inst in prog {
        match inst {
            Inst::Open => {
                opens.push(out.len());
                out.push(inst);
            }
            Inst::Close => match opens.pop() {
                Some(open) if out[open + 1..].iter().all(is_step) => {
                    match matcher(&out[open + 1..]) {
                        Some(fused) => {
                            out.truncate(open);
                            out.push(fused);
                        }
                        None => {
                            debug!(position = open, "candidate loop matched no idiom");
                            out.push(Inst::Close);
                        }
                    }
                }
                _ => out.push(Inst::Close),
            },
            other => out.push(other),
        }
    }
    out
}

fn run_len(body: &[Inst], inst: Inst) -> usize {
    body.iter().take_while(|&&i| i == inst).count()
}

/// `[-S..S I..I S'..S']` or `[S..S I..I S'..S' -]`: one control decrement,
/// a shift out, one or more increments or decrements, the same shift back.
fn match_move(body: &[Inst]) -> Option<Inst> {
    let core = if body.first() == Some(&Inst::Dec(1)) {
        &body[1..]
    } else if body.last() == Some(&Inst::Dec(1)) {
        &body[..body.len() - 1]
    } else {
        return None;
    };
    let (dir, step_out, step_back) = match core.first()? {
        Inst::Right(1) => (Dir::Right, Inst::Right(1), Inst::Left(1)),
        Inst::Left(1) => (Dir::Left, Inst::Left(1), Inst::Right(1)),
        _ => return None,
    };
    let places = run_len(core, step_out);
    let rest = &core[places..];
    let (weight, add) = match rest.first() {
        Some(Inst::Inc(1)) => (run_len(rest, Inst::Inc(1)), true),
        Some(Inst::Dec(1)) => (run_len(rest, Inst::Dec(1)), false),
        _ => return None,
    };
    let rest = &rest[weight..];
    if rest.len() != places || run_len(rest, step_back) != places {
        return None;
    }
    Some(if add {
        Inst::MoveAdd { dir, places, weight }
    } else {
        Inst::MoveSub { dir, places, weight }
    })
}

fn match_zero(body: &[Inst]) -> Option<Inst> {
    matches!(body, [Inst::Dec(1)]).then_some(Inst::Zero)
}

/// `[- (>..> +)+ <..<]`: fan-out with exactly one increment per destination,
/// evenly spaced, returning to the source cell.
fn match_copy(body: &[Inst]) -> Option<Inst> {
    let [Inst::Dec(1), rest @ ..] = body else {
        return None;
    };
    let mut rest = rest;
    let mut dists = Vec::new();
    let mut pos = 0usize;
    loop {
        let out = run_len(rest, Inst::Right(1));
        if out == 0 {
            break;
        }
        pos += out;
        rest = &rest[out..];
        if run_len(rest, Inst::Inc(1)) != 1 {
            return None;
        }
        rest = &rest[1..];
        dists.push(pos);
    }
    if dists.len() < 2 {
        return None;
    }
    if rest.len() != pos || run_len(rest, Inst::Left(1)) != pos {
        return None;
    }
    let stride = dists[1] - dists[0];
    if dists.windows(2).any(|w| w[1] - w[0] != stride) {
        return None;
    }
    let offset = dists[0].checked_sub(stride)?;
    Some(Inst::Copy { copies: dists.len(), stride, offset })
}

/// Collapse maximal runs of identical basic operators into one
/// parameterized opcode. Mixed runs never merge and never cancel.
fn compress(prog: Vec<Inst>) -> Vec<Inst> {
    let mut iter = prog.into_iter().peekable();
    let mut out = Vec::with_capacity(iter.size_hint().0);
    while let Some(inst) = iter.next() {
        let merged = match inst {
            Inst::Inc(mut n) => {
                while let Some(Inst::Inc(m)) = iter.peek() {
                    n += *m;
                    iter.next();
                }
                Inst::Inc(n)
            }
            Inst::Dec(mut n) => {
                while let Some(Inst::Dec(m)) = iter.peek() {
                    n += *m;
                    iter.next();
                }
                Inst::Dec(n)
            }
            Inst::Right(mut n) => {
                while let Some(Inst::Right(m)) = iter.peek() {
                    n += *m;
                    iter.next();
                }
                Inst::Right(n)
            }
            Inst::Left(mut n) => {
                while let Some(Inst::Left(m)) = iter.peek() {
                    n += *m;
                    iter.next();
                }
                Inst::Left(n)
            }
            other => other,
        };
        out.push(merged);
    }
    out
}
