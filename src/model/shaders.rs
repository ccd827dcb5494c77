//! GLSL sources. The backend prepends the `#version` line for the context.

pub const FILL_VERT: &str = r#"
precision highp float;

uniform mat4 u_ViewProjection;

in vec3 a_Position;
in vec4 a_Color;

out vec4 v_color;

void main() {
    v_color = a_Color;
    gl_Position = u_ViewProjection * vec4(a_Position, 1.0);
}
"#;

pub const FILL_FRAG: &str = r#"
precision highp float;

uniform float u_opacity;

in vec4 v_color;

out vec4 fragColor;

void main() {
    fragColor = vec4(v_color.rgb, v_color.a * u_opacity);
}
"#;

pub const LINE_VERT: &str = r#"
precision highp float;

uniform mat4 u_ViewProjection;
uniform vec2 u_PixelScale;
uniform vec2 u_PixelsPerDegree;
uniform float u_UnitsPerPixel;

in vec3 a_Position;
in vec4 a_Color;
in float a_Size;
in vec3 a_Normal;
in float a_Distance;

out vec4 v_color;
out float v_distance;

void main() {
    v_color = a_Color;
    v_distance = a_Distance / u_UnitsPerPixel;

    // Normals are perpendicular in degrees; the projection scales the axes
    // unevenly, so map them with the inverse scale and renormalize in pixels.
    vec2 normal = a_Normal.xy / u_PixelsPerDegree;
    float len = length(normal);
    normal = len > 0.0 ? normal / len : vec2(0.0);

    vec4 clip = u_ViewProjection * vec4(a_Position, 1.0);
    clip.xy += normal * a_Size * 0.5 * u_PixelScale * clip.w;
    gl_Position = clip;
}
"#;

pub const LINE_FRAG: &str = r#"
precision highp float;

uniform float u_opacity;
uniform float u_dashed;
uniform vec2 u_dash_array;

in vec4 v_color;
in float v_distance;

out vec4 fragColor;

void main() {
    if (u_dashed > 0.5) {
        float period = u_dash_array.x + u_dash_array.y;
        if (period > 0.0 && mod(v_distance, period) > u_dash_array.x) {
            discard;
        }
    }
    fragColor = vec4(v_color.rgb, v_color.a * u_opacity);
}
"#;

pub const POINT_VERT: &str = r#"
precision highp float;

uniform mat4 u_ViewProjection;
uniform vec2 u_PixelScale;

in vec3 a_Position;
in vec4 a_Color;
in float a_Size;
in vec3 a_Extrude;

out vec4 v_color;

void main() {
    v_color = a_Color;

    vec4 clip = u_ViewProjection * vec4(a_Position, 1.0);
    clip.xy += a_Extrude.xy * a_Size * u_PixelScale * clip.w;
    gl_Position = clip;
}
"#;

pub const POINT_FRAG: &str = FILL_FRAG;

pub const ATMOSPHERE_VERT: &str = r#"
precision highp float;

uniform mat4 u_ViewProjection;

in vec3 a_Position;
in float a_Size;
in vec3 a_Normal;
in vec2 a_Uv;

out float v_intensity;
out vec2 v_uv;

void main() {
    vec3 normal = normalize(a_Normal);
    // Rim glow: strongest where the surface faces away from the viewer
    v_intensity = pow(max(0.0, 0.8 - abs(normal.z)), 2.0);
    v_uv = a_Uv;

    float shell = 1.0 + 0.05 * a_Size;
    gl_Position = u_ViewProjection * vec4(a_Position * shell, 1.0);
}
"#;

pub const ATMOSPHERE_FRAG: &str = r#"
precision highp float;

uniform float u_opacity;

in float v_intensity;
in vec2 v_uv;

out vec4 fragColor;

void main() {
    vec3 sky = mix(vec3(0.35, 0.6, 1.0), vec3(0.55, 0.75, 1.0), v_uv.y);
    fragColor = vec4(sky, v_intensity * u_opacity);
}
"#;

pub const RASTER_VERT: &str = r#"
precision highp float;

uniform mat4 u_ViewProjection;

in vec3 a_Position;
in vec2 a_Uv;

out vec2 v_uv;

void main() {
    v_uv = a_Uv;
    gl_Position = u_ViewProjection * vec4(a_Position, 1.0);
}
"#;

pub const RASTER_FRAG: &str = r#"
precision highp float;

uniform sampler2D u_texture;
uniform float u_opacity;

in vec2 v_uv;

out vec4 fragColor;

void main() {
    vec4 color = texture(u_texture, v_uv);
    fragColor = vec4(color.rgb, color.a * u_opacity);
}
"#;
