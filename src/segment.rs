use crate::error::{PipelineError, Result};
use crate::types::Command;

/// Number of stages `tokens` describes, counting delimiters without
/// checking that every segment is non-empty.
pub fn count_stages<S: AsRef<str>>(tokens: &[S], delimiter: &str) -> usize {
	tokens.iter().filter(|t| t.as_ref() == delimiter).count() + 1
}

/// Splits `tokens` into commands on tokens equal to `delimiter`.
///
/// Only whole tokens match: `"a|b"` is an ordinary argument even when the
/// delimiter is `"|"`. An empty segment anywhere (empty input, leading,
/// trailing or doubled delimiter) is an error naming that segment.
pub fn segment<S: AsRef<str>>(tokens: &[S], delimiter: &str) -> Result<Vec<Command>> {
	let mut commands: Vec<Command> = Vec::new();
	commands.try_reserve_exact(count_stages(tokens, delimiter))?;

	let mut argv: Vec<String> = vec![];
	for token in tokens {
		let token = token.as_ref();
		if token == delimiter {
			commands.push(finish_segment(&mut argv, commands.len())?);
		} else {
			argv.push(token.to_owned());
		}
	}
	commands.push(finish_segment(&mut argv, commands.len())?);
	Ok(commands)
}

fn finish_segment(argv: &mut Vec<String>, stage: usize) -> Result<Command> {
	Command::new(std::mem::take(argv)).ok_or(PipelineError::Segmentation { stage: stage })
}
