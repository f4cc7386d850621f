use std::{io::BufRead, str::FromStr};

use crate::error::{DivError, Result};

/// Data lines of `reader` with their 1-based line numbers, comments and blanks skipped.
pub(crate) fn records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, Vec<String>)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(err) => Some(Err(DivError::from(err))),
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    Some(Ok((index + 1, line.split_whitespace().map(str::to_owned).collect())))
                }
            }
        })
}

pub(crate) fn field<T: FromStr>(line: usize, value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| DivError::parse(line, format!("invalid {what} '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let input = "# header\n\n1 2 3\n   \n  # indented comment\n4 5\n";
        let rows: Vec<_> = records(input.as_bytes()).collect::<Result<_>>().unwrap();
        assert_eq!(
            rows,
            vec![
                (3, vec!["1".to_owned(), "2".to_owned(), "3".to_owned()]),
                (6, vec!["4".to_owned(), "5".to_owned()]),
            ]
        );
    }

    #[test]
    fn field_reports_the_line() {
        let err = field::<u32>(7, "x1", "vertex").unwrap_err();
        assert_eq!(err.to_string(), "Parse error on line 7: invalid vertex 'x1'");
    }
}
