//! Test fixtures - GLSL snippets for testing

use indoc::indoc;

/// Marker that makes [`crate::mocks::ScriptedCompiler`] reject a source
pub const FAIL_MARKER: &str = "#error";

/// Fragment shader including `common.glsl`
pub fn main_shader() -> &'static str {
    indoc! {r#"
        #version 460
        #include "common.glsl"

        layout(location = 0) out vec4 out_color;

        void main() {
            out_color = vec4(tone_map(vec3(1.0)), 1.0);
        }
    "#}
}

pub fn common_include() -> &'static str {
    indoc! {r#"
        vec3 tone_map(vec3 color) {
            return color / (color + vec3(1.0));
        }
    "#}
}

/// Shader with no includes at all
pub fn standalone_shader() -> &'static str {
    indoc! {r#"
        #version 460

        void main() {
            gl_Position = vec4(0.0);
        }
    "#}
}

pub fn broken_shader() -> &'static str {
    indoc! {r#"
        #version 460
        #error this shader does not compile

        void main() {
    "#}
}

/// A single `#include` line for `literal`
pub fn include_line(literal: &str) -> String {
    format!("#include \"{}\"\n", literal)
}

/// Files forming a straight include chain of `depth` levels below `root`
///
/// Returns `(relative path, contents)` pairs: `root` includes `level1.glsl`,
/// which includes `level2.glsl`, down to `level{depth}.glsl`.
pub fn include_chain(root: &str, depth: u32) -> Vec<(String, String)> {
    let mut files = Vec::new();
    let mut current = root.to_string();

    for level in 1..=depth {
        let next = format!("level{}.glsl", level);
        files.push((current, include_line(&next)));
        current = next;
    }
    files.push((current, "float leaf;\n".to_string()));

    files
}
