/*!
builder.rs - raw tokens + parameter shape -> typed `Args`.

Rules:
  - fewer tokens than parameters -> arity mismatch (a remainder parameter
    still needs at least one token)
  - the final remainder parameter receives every token from its position on,
    joined with the separator
  - extra tokens without a remainder parameter are ignored
  - any parse or ensure failure aborts the whole build; no partial result
*/

use super::command::{Args, Command};
use super::parser::TypeParsers;
use super::report::Rejection;

/// Token separator. There is no quoting or escaping.
pub const SEPARATOR: &str = " ";

/// Build the argument list for `command` from the tokens after the head.
pub fn build_arguments(
    tokens: &[&str],
    command: &Command,
    parsers: &TypeParsers,
) -> Result<Args, Rejection> {
    let params = command.params();
    let has_remainder = command.has_remainder();

    if tokens.len() < params.len() {
        return Err(Rejection::ArityMismatch {
            expected: params.len(),
            got: tokens.len(),
        });
    }

    let mut built = Vec::with_capacity(params.len());

    for (i, param) in params.iter().enumerate() {
        let joined;
        let token = if has_remainder && i == params.len() - 1 {
            joined = tokens[i..].join(SEPARATOR);
            joined.as_str()
        } else {
            tokens[i]
        };

        let value = parsers
            .parse(token, param.key(), param.converter())
            .ok_or_else(|| Rejection::ParseFailure {
                param: param.name().to_string(),
                expected_type: param.key().name().to_string(),
                token: token.to_string(),
            })?;

        let value = param
            .apply_ensure(value)
            .map_err(|e| Rejection::EnsureFailure {
                param: param.name().to_string(),
                error: format!("{e:#}"),
            })?;

        built.push(value);
    }

    Ok(Args::new(built))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::command::Param;
    use anyhow::{anyhow, bail};

    #[derive(Debug, PartialEq)]
    enum Enemy {
        Crawlid,
        Vengefly,
    }

    impl std::str::FromStr for Enemy {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.to_ascii_lowercase().as_str() {
                "crawlid" => Ok(Enemy::Crawlid),
                "vengefly" => Ok(Enemy::Vengefly),
                _ => Err(anyhow!("unknown enemy")),
            }
        }
    }

    fn noop(builder: crate::dispatch::command::CommandBuilder) -> Command {
        builder.handler(|_| Ok(())).unwrap()
    }

    fn tokens(s: &str) -> Vec<&str> {
        s.split(SEPARATOR).collect()
    }

    #[test]
    fn remainder_rejoins_trailing_text() {
        let cmd = noop(Command::builder("say").param(Param::of::<String>("text").remainder()));
        let parsers = TypeParsers::new();
        let mut args = build_arguments(&tokens("hello world !"), &cmd, &parsers).unwrap();
        assert_eq!(args.take::<String>(0).unwrap(), "hello world !");
    }

    #[test]
    fn remainder_after_positional() {
        let cmd = noop(
            Command::builder("whisper")
                .param(Param::of::<String>("to"))
                .param(Param::of::<String>("text").remainder()),
        );
        let parsers = TypeParsers::new();
        let args = build_arguments(&tokens("grub you  are free"), &cmd, &parsers).unwrap();
        assert_eq!(args.get::<String>(0).unwrap(), "grub");
        assert_eq!(args.get::<String>(1).unwrap(), "you  are free", "empty tokens kept");
    }

    #[test]
    fn remainder_needs_a_token() {
        let cmd = noop(Command::builder("say").param(Param::of::<String>("text").remainder()));
        let err = build_arguments(&[], &cmd, &TypeParsers::new()).unwrap_err();
        assert_eq!(err, Rejection::ArityMismatch { expected: 1, got: 0 });
    }

    #[test]
    fn parse_failure_aborts() {
        let cmd = noop(
            Command::builder("give")
                .param(Param::of::<String>("item"))
                .param(Param::of::<i32>("amount")),
        );
        let err = build_arguments(&tokens("sword abc"), &cmd, &TypeParsers::new()).unwrap_err();
        assert_eq!(
            err,
            Rejection::ParseFailure {
                param: "amount".into(),
                expected_type: "i32".into(),
                token: "abc".into(),
            }
        );
    }

    #[test]
    fn arity_and_extra_tokens() {
        let cmd = noop(
            Command::builder("give")
                .param(Param::of::<String>("item"))
                .param(Param::of::<i32>("amount")),
        );
        let parsers = TypeParsers::new();
        assert!(matches!(
            build_arguments(&tokens("sword"), &cmd, &parsers),
            Err(Rejection::ArityMismatch { expected: 2, got: 1 })
        ));
        let args = build_arguments(&tokens("sword 3 ignored"), &cmd, &parsers).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(*args.get::<i32>(1).unwrap(), 3);
    }

    #[test]
    fn enum_choice_uses_from_str() {
        let cmd = noop(Command::builder("spawn").param(Param::choice::<Enemy>("enemy")));
        let parsers = TypeParsers::new();
        let args = build_arguments(&tokens("VENGEFLY"), &cmd, &parsers).unwrap();
        assert_eq!(args.get::<Enemy>(0).unwrap(), &Enemy::Vengefly);
        assert!(build_arguments(&tokens("hornet"), &cmd, &parsers).is_err());
    }

    #[test]
    fn ensure_replaces_or_rejects() {
        let cmd = noop(Command::builder("speed").param(
            Param::of::<f32>("factor").ensure(|f: f32| {
                if f.is_nan() {
                    bail!("not a number");
                }
                Ok(f.clamp(0.1, 4.0))
            }),
        ));
        let parsers = TypeParsers::new();
        let args = build_arguments(&tokens("10"), &cmd, &parsers).unwrap();
        assert_eq!(*args.get::<f32>(0).unwrap(), 4.0);

        let err = build_arguments(&tokens("NaN"), &cmd, &parsers).unwrap_err();
        assert!(matches!(err, Rejection::EnsureFailure { ref param, .. } if param == "factor"));
    }

    #[test]
    fn zero_params_accept_anything() {
        let cmd = noop(Command::builder("ping"));
        let args = build_arguments(&tokens("whatever here"), &cmd, &TypeParsers::new()).unwrap();
        assert!(args.is_empty());
    }
}
