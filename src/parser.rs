use thiserror::Error;

/// A native statement, produced from the tokens of one line.
///
/// Each line maps to exactly one statement; there are no blocks and no
/// statement spans more than one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `name = value`: store `value` in the variable store.
    Assign {
        /// Variable being assigned.
        name: String,
        /// Parsed integer value.
        value: i32,
    },

    /// `print: word...`: emit the words joined by single spaces.
    /// An empty message is a no-op.
    Print {
        /// The words following the keyword.
        message: Vec<String>,
    },

    /// `if var == value`: report when the variable equals `value`.
    /// There is no body; the statement only reports.
    If {
        /// Variable to compare.
        var: String,
        /// Value it is compared against.
        value: i32,
    },

    /// `while var < limit`: report and increment `var` until it reaches `limit`.
    While {
        /// Loop counter.
        var: String,
        /// Exclusive upper bound.
        limit: i32,
    },

    /// `for var = start to end`: set `var` to `start`, then report and
    /// increment until it reaches `end`.
    For {
        /// Loop counter.
        var: String,
        /// Initial counter value.
        start: i32,
        /// Exclusive upper bound.
        end: i32,
    },

    /// `class Name`: a label, nothing is stored.
    Class {
        /// Declared class name.
        name: String,
    },

    /// `func name word...`: store the remaining words of the line as the function body.
    Func {
        /// Function name.
        name: String,
        /// Body words, in source order.
        body: Vec<String>,
    },
}

/// Errors that can occur while turning tokens into a [`Statement`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// A token in an integer position is not a base-10 `i32`.
    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    /// The statement ended before a required token.
    #[error("Parse error: '{keyword}' expects at least {expected} tokens, got {found}")]
    MissingTokens {
        /// The keyword (or `=` for assignments) that was being parsed.
        keyword: String,
        /// Minimum number of tokens the statement needs.
        expected: usize,
        /// Number of tokens on the line.
        found: usize,
    },

    /// The first token names no known statement and the line is not an assignment.
    #[error("Parse error: unrecognized statement '{0}'")]
    UnrecognizedStatement(String),

    /// No tokens at all.
    #[error("Parse error: empty statement")]
    Empty,
}

struct StatementBuilder {
    tokens: Vec<String>,
}

impl StatementBuilder {
    fn from(tokens: Vec<String>) -> Self {
        StatementBuilder { tokens }
    }

    fn build(mut self) -> Result<Statement, ParsingError> {
        if self.tokens.is_empty() {
            return Err(ParsingError::Empty);
        }

        // Assignment wins over keywords: `if = 3` assigns the variable `if`.
        if self.tokens.get(1).map(String::as_str) == Some("=") {
            return self.parse_assignment();
        }

        let keyword = self.tokens[0].clone();
        match keyword.as_str() {
            "print:" => Ok(Statement::Print {
                message: self.tokens.split_off(1),
            }),
            "if" => {
                self.require("if", 4)?;
                Ok(Statement::If {
                    var: self.take(1),
                    value: parse_number(&self.tokens[3])?,
                })
            }
            "while" => {
                self.require("while", 4)?;
                Ok(Statement::While {
                    var: self.take(1),
                    limit: parse_number(&self.tokens[3])?,
                })
            }
            "for" => {
                self.require("for", 6)?;
                Ok(Statement::For {
                    var: self.take(1),
                    start: parse_number(&self.tokens[3])?,
                    end: parse_number(&self.tokens[5])?,
                })
            }
            "class" => {
                self.require("class", 2)?;
                Ok(Statement::Class { name: self.take(1) })
            }
            "func" => {
                self.require("func", 2)?;
                let body = self.tokens.split_off(2);
                Ok(Statement::Func {
                    name: self.take(1),
                    body,
                })
            }
            other => Err(ParsingError::UnrecognizedStatement(other.to_string())),
        }
    }

    /// Parse `name = value`. Tokens after the value are ignored.
    fn parse_assignment(mut self) -> Result<Statement, ParsingError> {
        self.require("=", 3)?;
        let value = parse_number(&self.tokens[2])?;
        Ok(Statement::Assign {
            name: self.take(0),
            value,
        })
    }

    fn require(&self, keyword: &str, expected: usize) -> Result<(), ParsingError> {
        if self.tokens.len() < expected {
            return Err(ParsingError::MissingTokens {
                keyword: keyword.to_string(),
                expected,
                found: self.tokens.len(),
            });
        }
        Ok(())
    }

    fn take(&mut self, index: usize) -> String {
        std::mem::take(&mut self.tokens[index])
    }
}

/// Base-10 signed integer conversion used for every integer position.
pub fn parse_number(token: &str) -> Result<i32, ParsingError> {
    token
        .parse::<i32>()
        .map_err(|_| ParsingError::InvalidNumber(token.to_string()))
}

/// The main entry point of the parser.
///
/// Takes the tokens of one native line (language tag already stripped) and
/// returns the statement they describe.
pub fn parse_statement(tokens: Vec<String>) -> Result<Statement, ParsingError> {
    StatementBuilder::from(tokens).build()
}
