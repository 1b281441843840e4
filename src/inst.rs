use thiserror::Error;

/// Direction of a fused move relative to the source cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Left,
    Right,
}

/// One executable opcode. Bare symbols decode to the parameterized form
/// with every parameter at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    Inc(usize),
    Dec(usize),
    Right(usize),
    Left(usize),
    MoveAdd { dir: Dir, places: usize, weight: usize },
    MoveSub { dir: Dir, places: usize, weight: usize },
    Zero,
    Copy { copies: usize, stride: usize, offset: usize },
    Open,
    Close,
    Output,
    Input,
}

impl Inst {
    /// Text token in the persisted single-line format.
    pub fn token(&self) -> String {
        fn step(amount: usize, symbol: char) -> String {
            if amount == 1 {
                symbol.to_string()
            } else {
                format!("{amount}{symbol}")
            }
        }
        fn mov(dir: Dir, places: usize, weight: usize, letter: (char, char)) -> String {
            let letter = match dir {
                Dir::Left => letter.0,
                Dir::Right => letter.1,
            };
            if weight == 1 && places == 1 {
                letter.to_string()
            } else if weight == 1 {
                format!("{places}{letter}")
            } else {
                format!("{weight}_{places}{letter}")
            }
        }
        match *self {
            Inst::Inc(n) => step(n, '+'),
            Inst::Dec(n) => step(n, '-'),
            Inst::Right(n) => step(n, '>'),
            Inst::Left(n) => step(n, '<'),
            Inst::MoveAdd { dir, places, weight } => mov(dir, places, weight, ('a', 'A')),
            Inst::MoveSub { dir, places, weight } => mov(dir, places, weight, ('s', 'S')),
            Inst::Zero => "Z".to_string(),
            Inst::Copy { copies, stride, offset } => format!("{copies}_{stride}_{offset}C"),
            Inst::Open => "[".to_string(),
            Inst::Close => "]".to_string(),
            Inst::Output => ".".to_string(),
            Inst::Input => ",".to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized opcode {token:?} at column {column}")]
    UnknownOpcode { token: String, column: usize },
    #[error("malformed token {token:?} at column {column}")]
    Malformed { token: String, column: usize },
    #[error("parameter out of range at column {column}")]
    ParamOverflow { column: usize },
    #[error("dangling parameters at end of stream")]
    Dangling,
}

/// Render an opcode stream as one line of concatenated tokens.
pub fn encode(code: &[Inst]) -> String {
    code.iter().map(Inst::token).collect()
}

/// Parse the single-line token format back into an opcode stream.
/// Fails before execution on any token matching no known shape.
pub fn decode(text: &str) -> Result<Vec<Inst>, DecodeError> {
    let mut out = Vec::new();
    let mut params: Vec<usize> = Vec::new();
    let mut cur: Option<usize> = None;
    for (column, ch) in text.chars().enumerate() {
        match ch {
            '0'..='9' => {
                let digit = ch as usize - '0' as usize;
                let value = cur
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(DecodeError::ParamOverflow { column })?;
                cur = Some(value);
            }
            '_' => match cur.take() {
                Some(n) => params.push(n),
                None => {
                    return Err(DecodeError::Malformed {
                        token: "_".to_string(),
                        column,
                    });
                }
            },
            c if c.is_whitespace() => {
                if cur.is_some() || !params.is_empty() {
                    return Err(DecodeError::Malformed {
                        token: c.to_string(),
                        column,
                    });
                }
            }
            c => {
                if let Some(n) = cur.take() {
                    params.push(n);
                }
                out.push(inst_from(c, &params, column)?);
                params.clear();
            }
        }
    }
    if cur.is_some() || !params.is_empty() {
        return Err(DecodeError::Dangling);
    }
    Ok(out)
}

fn inst_from(symbol: char, params: &[usize], column: usize) -> Result<Inst, DecodeError> {
    let malformed = || DecodeError::Malformed {
        token: symbol.to_string(),
        column,
    };
    let amount = |make: fn(usize) -> Inst| match params {
        [] => Ok(make(1)),
        [n] => Ok(make(*n)),
        _ => Err(malformed()),
    };
    let mov = |dir: Dir, add: bool| {
        let (places, weight) = match params {
            [] => (1, 1),
            [p] => (*p, 1),
            [w, p] => (*p, *w),
            _ => return Err(malformed()),
        };
        if weight == 0 {
            return Err(malformed());
        }
        Ok(if add {
            Inst::MoveAdd { dir, places, weight }
        } else {
            Inst::MoveSub { dir, places, weight }
        })
    };
    let plain = |inst: Inst| {
        if params.is_empty() {
            Ok(inst)
        } else {
            Err(malformed())
        }
    };
    match symbol {
        '+' => amount(Inst::Inc),
        '-' => amount(Inst::Dec),
        '>' => amount(Inst::Right),
        '<' => amount(Inst::Left),
        'a' => mov(Dir::Left, true),
        'A' => mov(Dir::Right, true),
        's' => mov(Dir::Left, false),
        'S' => mov(Dir::Right, false),
        'Z' => plain(Inst::Zero),
        'C' => match params {
            [copies, stride, offset] => Ok(Inst::Copy {
                copies: *copies,
                stride: *stride,
                offset: *offset,
            }),
            _ => Err(malformed()),
        },
        '[' => plain(Inst::Open),
        ']' => plain(Inst::Close),
        '.' => plain(Inst::Output),
        ',' => plain(Inst::Input),
        _ => Err(DecodeError::UnknownOpcode {
            token: symbol.to_string(),
            column,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_symbols_decode_with_unit_parameters() {
        let code = decode("+-<>[].,ZA").unwrap();
        assert_eq!(
            code,
            vec![
                Inst::Inc(1),
                Inst::Dec(1),
                Inst::Left(1),
                Inst::Right(1),
                Inst::Open,
                Inst::Close,
                Inst::Output,
                Inst::Input,
                Inst::Zero,
                Inst::MoveAdd { dir: Dir::Right, places: 1, weight: 1 },
            ]
        );
    }

    #[test]
    fn parameterized_tokens() {
        assert_eq!(decode("3+").unwrap(), vec![Inst::Inc(3)]);
        assert_eq!(
            decode("2A").unwrap(),
            vec![Inst::MoveAdd { dir: Dir::Right, places: 2, weight: 1 }]
        );
        assert_eq!(
            decode("3_2a").unwrap(),
            vec![Inst::MoveAdd { dir: Dir::Left, places: 2, weight: 3 }]
        );
        assert_eq!(
            decode("4_2s").unwrap(),
            vec![Inst::MoveSub { dir: Dir::Left, places: 2, weight: 4 }]
        );
        assert_eq!(
            decode("2_1_0C").unwrap(),
            vec![Inst::Copy { copies: 2, stride: 1, offset: 0 }]
        );
    }

    #[test]
    fn round_trip() {
        let text = "5+2A4-3<[2>]2_1_0CZ.,s7_3S";
        let code = decode(text).unwrap();
        assert_eq!(encode(&code), text);
        assert_eq!(decode(&encode(&code)).unwrap(), code);
    }

    #[test]
    fn rejects_unknown_and_malformed_tokens() {
        assert!(matches!(
            decode("+x").unwrap_err(),
            DecodeError::UnknownOpcode { column: 1, .. }
        ));
        assert!(matches!(decode("3Z").unwrap_err(), DecodeError::Malformed { .. }));
        assert!(matches!(decode("1_2_3A").unwrap_err(), DecodeError::Malformed { .. }));
        assert!(matches!(decode("2_1C").unwrap_err(), DecodeError::Malformed { .. }));
        assert!(matches!(decode("0_2A").unwrap_err(), DecodeError::Malformed { .. }));
        assert!(matches!(decode("_A").unwrap_err(), DecodeError::Malformed { .. }));
        assert_eq!(decode("12").unwrap_err(), DecodeError::Dangling);
    }

    #[test]
    fn overflowing_parameter_is_rejected() {
        let huge = "9".repeat(40) + "+";
        assert!(matches!(decode(&huge).unwrap_err(), DecodeError::ParamOverflow { .. }));
    }
}
