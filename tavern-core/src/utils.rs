// ABOUTME: Shared text utilities for outbound message handling
// ABOUTME: Chunks long replies under the chat transport's message size limit

/// Chat transports commonly cap messages at 2000 characters; splitting at
/// 1990 leaves headroom for trailing markup the platform may add.
pub const CHUNK_BOUNDARY: usize = 1990;

/// Split long text into chunks, trying to break at line then word boundaries
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > max_chars {
            chunks.push(current.trim().to_string());
            current = String::new();
        }

        if line.len() > max_chars {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
                current = String::new();
            }
            // Split an oversized line at word boundaries
            let mut line_part = String::new();
            for word in line.split_whitespace() {
                if word.len() > max_chars {
                    // An unbroken run longer than the limit (URL, letter
                    // spam) has no word boundary to split at; hard-split it
                    // so no chunk can exceed the transport cap
                    if !line_part.is_empty() {
                        chunks.push(line_part.trim().to_string());
                        line_part = String::new();
                    }
                    let mut rest = word;
                    while rest.len() > max_chars {
                        let mut cut = max_chars;
                        while !rest.is_char_boundary(cut) {
                            cut -= 1;
                        }
                        chunks.push(rest[..cut].to_string());
                        rest = &rest[cut..];
                    }
                    line_part = rest.to_string();
                } else if line_part.len() + word.len() + 1 > max_chars {
                    if !line_part.is_empty() {
                        chunks.push(line_part.trim().to_string());
                    }
                    line_part = word.to_string();
                } else {
                    if !line_part.is_empty() {
                        line_part.push(' ');
                    }
                    line_part.push_str(word);
                }
            }
            if !line_part.is_empty() {
                current = line_part;
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}
