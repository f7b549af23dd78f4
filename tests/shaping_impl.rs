use std::str::FromStr;

struct Args {
    direction: Option<aatbuzz::Direction>,
    language: Option<aatbuzz::Language>,
    script: Option<aatbuzz::Script>,
    features: Vec<String>,
    pre_context: Option<String>,
    post_context: Option<String>,
    keep_deleted: bool,
    produce_unsafe_to_concat: bool,
    produce_safe_to_insert_tatweel: bool,
    no_positions: bool,
    no_advances: bool,
    no_clusters: bool,
    show_flags: bool,
    ned: bool,
}

fn parse_args(args: Vec<std::ffi::OsString>) -> Result<Args, pico_args::Error> {
    let mut parser = pico_args::Arguments::from_vec(args);
    let args = Args {
        direction: parser.opt_value_from_str("--direction")?,
        language: parser.opt_value_from_str("--language")?,
        script: parser.opt_value_from_str("--script")?,
        features: parser.opt_value_from_fn("--features", parse_string_list)?.unwrap_or_default(),
        pre_context: parser.opt_value_from_str("--pre-context")?,
        post_context: parser.opt_value_from_str("--post-context")?,
        keep_deleted: parser.contains("--keep-deleted"),
        produce_unsafe_to_concat: parser.contains("--produce-unsafe-to-concat"),
        produce_safe_to_insert_tatweel: parser.contains("--produce-safe-to-insert-tatweel"),
        no_positions: parser.contains("--no-positions"),
        no_advances: parser.contains("--no-advances"),
        no_clusters: parser.contains("--no-clusters"),
        show_flags: parser.contains("--show-flags"),
        ned: parser.contains("--ned"),
    };

    parser.finish()?;

    Ok(args)
}

fn parse_string_list(s: &str) -> Result<Vec<String>, String> {
    Ok(s.split(',').map(|s| s.to_string()).collect())
}

/// Shapes `text` with hb-shape style `options` and serializes the result.
pub fn shape(face: &aatbuzz::Face, text: &str, options: &str) -> String {
    let args = options
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(std::ffi::OsString::from)
        .collect();
    let args = parse_args(args).unwrap();

    let mut buffer = aatbuzz::UnicodeBuffer::new();
    buffer.push_str(text);

    if let Some(d) = args.direction {
        buffer.set_direction(d);
    }

    if let Some(lang) = args.language {
        buffer.set_language(lang);
    }

    if let Some(script) = args.script {
        buffer.set_script(script);
    }

    if let Some(ref s) = args.pre_context {
        buffer.set_pre_context(s);
    }

    if let Some(ref s) = args.post_context {
        buffer.set_post_context(s);
    }

    let mut flags = aatbuzz::BufferFlags::empty();
    if args.produce_unsafe_to_concat {
        flags |= aatbuzz::BufferFlags::PRODUCE_UNSAFE_TO_CONCAT;
    }

    if args.produce_safe_to_insert_tatweel {
        flags |= aatbuzz::BufferFlags::PRODUCE_SAFE_TO_INSERT_TATWEEL;
    }

    buffer.set_flags(flags);
    buffer.guess_segment_properties();

    let mut features = Vec::new();
    for feature_str in args.features {
        let feature = aatbuzz::Feature::from_str(&feature_str).unwrap();
        features.push(feature);
    }

    let mut plan = aatbuzz::ShapePlan::new(face, buffer.direction(), Some(buffer.script()), &features);
    plan.set_remove_deleted_glyphs(!args.keep_deleted);

    let glyph_buffer = aatbuzz::shape_with_plan(face, &plan, buffer);

    let mut format_flags = aatbuzz::SerializeFlags::default();
    if args.no_clusters || args.ned {
        format_flags |= aatbuzz::SerializeFlags::NO_CLUSTERS;
    }

    if args.no_positions {
        format_flags |= aatbuzz::SerializeFlags::NO_POSITIONS;
    }

    if args.no_advances || args.ned {
        format_flags |= aatbuzz::SerializeFlags::NO_ADVANCES;
    }

    if args.show_flags {
        format_flags |= aatbuzz::SerializeFlags::GLYPH_FLAGS;
    }

    glyph_buffer.serialize(format_flags)
}
