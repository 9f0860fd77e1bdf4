// Field tokenizer: per-worker state machine emitting (byte-range,
// quoted?) for each field of each record in a worker's byte range.
//
// States mirror the six named states: FieldStart, Unquoted, Quoted,
// QuotedEscapePeek, AfterQuoted, RecordEnd. RecordEnd is implicit here —
// `next_record` returns whenever a terminator is consumed or input ends.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    QuotedEscapePeek,
    AfterQuoted,
}

/// A field's raw byte range (inclusive of surrounding quotes, if any) in
/// the tokenizer's input slice. Callers extract the unescaped content via
/// `core::field::extract_field_cow_with_escape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub start: usize,
    pub end: usize,
    pub was_quoted: bool,
}

/// One parsed record: its fields and whether anything anomalous happened
/// while scanning it.
#[derive(Debug, Default)]
pub struct Record {
    pub fields: Vec<FieldSpan>,
    /// `\n` seen inside a quoted field while quoted newlines are disallowed
    /// (the field is terminated early with an anomaly, per spec's Quoted
    /// state transition table).
    pub quoted_newline_anomaly: bool,
    /// Bytes dropped between a field's closing quote and its delimiter
    /// (the AfterQuoted sticky-garbage case).
    pub trailing_garbage_anomaly: bool,
}

/// Scans one worker's byte range (`data[start..end]`) into records.
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    delimiter: u8,
    quote: u8,
    allow_quoted_newlines: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(
        data: &'a [u8],
        start: usize,
        end: usize,
        delimiter: u8,
        quote: u8,
        allow_quoted_newlines: bool,
    ) -> Self {
        Tokenizer {
            data,
            pos: start,
            limit: end,
            delimiter,
            quote,
            allow_quoted_newlines,
        }
    }

    #[inline]
    fn is_crlf_at(&self, i: usize) -> bool {
        self.data[i] == b'\r' && i + 1 < self.limit && self.data[i + 1] == b'\n'
    }

    /// Parse the next record, or `None` if the range is exhausted.
    pub fn next_record(&mut self) -> Option<Record> {
        if self.pos >= self.limit {
            return None;
        }

        let mut rec = Record::default();
        let mut state = State::FieldStart;
        let mut field_start = self.pos;
        let mut quote_close_pos = 0usize;
        let mut i = self.pos;

        loop {
            if i >= self.limit {
                // Input ended without a terminator. Flush a trailing field
                // unless we're at a fresh FieldStart with no content (that
                // would be an extra phantom empty record at end of input).
                match state {
                    State::FieldStart if field_start == i && rec.fields.is_empty() => {}
                    State::FieldStart => {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: false,
                        });
                    }
                    State::Unquoted => {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: false,
                        });
                    }
                    State::Quoted => {
                        // Unterminated quote at EOF: treat everything
                        // scanned so far as the (still-open) quoted field.
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                    }
                    State::QuotedEscapePeek => {
                        // The closing quote was the last byte read (its
                        // index is `i - 1`); include it in the span.
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                    }
                    State::AfterQuoted => {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: quote_close_pos + 1,
                            was_quoted: true,
                        });
                    }
                }
                self.pos = i;
                return Some(rec);
            }

            let b = self.data[i];

            match state {
                State::FieldStart => {
                    if b == self.quote {
                        state = State::Quoted;
                        field_start = i;
                        i += 1;
                    } else if b == self.delimiter {
                        rec.fields.push(FieldSpan {
                            start: i,
                            end: i,
                            was_quoted: false,
                        });
                        i += 1;
                        field_start = i;
                    } else if b == b'\n' {
                        rec.fields.push(FieldSpan {
                            start: i,
                            end: i,
                            was_quoted: false,
                        });
                        i += 1;
                        self.pos = i;
                        return Some(rec);
                    } else if self.is_crlf_at(i) {
                        rec.fields.push(FieldSpan {
                            start: i,
                            end: i,
                            was_quoted: false,
                        });
                        i += 2;
                        self.pos = i;
                        return Some(rec);
                    } else {
                        state = State::Unquoted;
                        field_start = i;
                        i += 1;
                    }
                }
                State::Unquoted => {
                    if b == self.delimiter {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: false,
                        });
                        i += 1;
                        field_start = i;
                        state = State::FieldStart;
                    } else if b == b'\n' {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: false,
                        });
                        i += 1;
                        self.pos = i;
                        return Some(rec);
                    } else if self.is_crlf_at(i) {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: false,
                        });
                        i += 2;
                        self.pos = i;
                        return Some(rec);
                    } else {
                        i += 1;
                    }
                }
                State::Quoted => {
                    if b == self.quote {
                        state = State::QuotedEscapePeek;
                        i += 1;
                    } else if b == b'\n' && !self.allow_quoted_newlines {
                        rec.quoted_newline_anomaly = true;
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                        i += 1;
                        self.pos = i;
                        return Some(rec);
                    } else {
                        // Includes bare `\r`, which is ordinary data here
                        // (resolves the quoted-bare-CR open question).
                        i += 1;
                    }
                }
                State::QuotedEscapePeek => {
                    if b == self.quote {
                        // Doubled quote: escaped literal, stay quoted.
                        state = State::Quoted;
                        i += 1;
                    } else if b == self.delimiter {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                        i += 1;
                        field_start = i;
                        state = State::FieldStart;
                    } else if b == b'\n' {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                        i += 1;
                        self.pos = i;
                        return Some(rec);
                    } else if self.is_crlf_at(i) {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: i,
                            was_quoted: true,
                        });
                        i += 2;
                        self.pos = i;
                        return Some(rec);
                    } else {
                        quote_close_pos = i - 1;
                        state = State::AfterQuoted;
                        rec.trailing_garbage_anomaly = true;
                        i += 1;
                    }
                }
                State::AfterQuoted => {
                    if b == self.delimiter {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: quote_close_pos + 1,
                            was_quoted: true,
                        });
                        i += 1;
                        field_start = i;
                        state = State::FieldStart;
                    } else if b == b'\n' {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: quote_close_pos + 1,
                            was_quoted: true,
                        });
                        i += 1;
                        self.pos = i;
                        return Some(rec);
                    } else if self.is_crlf_at(i) {
                        rec.fields.push(FieldSpan {
                            start: field_start,
                            end: quote_close_pos + 1,
                            was_quoted: true,
                        });
                        i += 2;
                        self.pos = i;
                        return Some(rec);
                    } else {
                        // Dropped trailing garbage byte; anomaly already
                        // recorded on entry to AfterQuoted.
                        i += 1;
                    }
                }
            }
        }
    }

    /// Current scan position, for recovery-walk reinforcement checks.
    pub fn pos(&self) -> usize {
        self.pos
    }
}
