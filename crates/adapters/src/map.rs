//! Static map renderer built from slippy-map tiles

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use planning_poster_domain::{Coordinates, MapImage, MapRenderer, RenderError};
use reqwest::Client;
use std::f64::consts::PI;
use std::path::PathBuf;
use std::time::Duration;

const TILE_SIZE: u32 = 256;
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Highest zoom served by common tile providers
pub const MAX_ZOOM: u8 = 19;

/// Settings for the static map renderer
#[derive(Debug, Clone)]
pub struct MapSettings {
    /// Tile URL with `{z}`, `{x}` and `{y}` placeholders
    pub tile_url_template: String,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    /// PNG marker icon; a drawn pin is used when absent
    pub marker_icon: Option<PathBuf>,
    /// Point of the icon placed on the coordinates, from its top-left corner
    pub marker_offset: (i64, i64),
    pub user_agent: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            zoom: 17,
            width: 1200,
            height: 630,
            marker_icon: None,
            marker_offset: (18, 30),
            user_agent: concat!("planning-poster/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Renders a fixed-size map centred on a single marker
pub struct StaticMapRenderer {
    client: Client,
    settings: MapSettings,
    marker: RgbaImage,
}

impl StaticMapRenderer {
    pub fn new(settings: MapSettings) -> Result<Self, RenderError> {
        if settings.zoom > MAX_ZOOM {
            return Err(RenderError::Image(format!(
                "Map zoom {} exceeds the maximum of {}",
                settings.zoom, MAX_ZOOM
            )));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(RenderError::Image(
                "Map width and height must be greater than zero".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| RenderError::Image(format!("Failed to build HTTP client: {}", e)))?;

        let marker = match &settings.marker_icon {
            Some(path) => image::open(path)
                .map_err(|e| {
                    RenderError::Image(format!("Failed to load marker {}: {}", path.display(), e))
                })?
                .to_rgba8(),
            None => default_marker(),
        };

        Ok(Self {
            client,
            settings,
            marker,
        })
    }

    fn tile_url(&self, zoom: u8, x: i64, y: i64) -> String {
        self.settings
            .tile_url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    async fn fetch_tile(&self, url: &str) -> Result<RgbaImage, RenderError> {
        let tile_error = |message: String| RenderError::Tile {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| tile_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(tile_error(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| tile_error(e.to_string()))?;

        image::load_from_memory(&bytes)
            .map(|tile| tile.to_rgba8())
            .map_err(|e| tile_error(e.to_string()))
    }

    async fn compose(&self, coordinates: Coordinates) -> Result<RgbaImage, RenderError> {
        let MapSettings {
            zoom,
            width,
            height,
            marker_offset,
            ..
        } = self.settings;

        let (center_x, center_y) = project(coordinates, zoom);
        let left = center_x - f64::from(width) / 2.0;
        let top = center_y - f64::from(height) / 2.0;
        let tile = f64::from(TILE_SIZE);
        let tiles_per_axis = 1i64 << zoom;

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([221, 221, 221, 255]));

        let x_range = (left / tile).floor() as i64..=((left + f64::from(width) - 1.0) / tile).floor() as i64;
        let y_range = (top / tile).floor() as i64..=((top + f64::from(height) - 1.0) / tile).floor() as i64;

        for tile_y in y_range {
            if tile_y < 0 || tile_y >= tiles_per_axis {
                continue;
            }
            for tile_x in x_range.clone() {
                let url = self.tile_url(zoom, tile_x.rem_euclid(tiles_per_axis), tile_y);
                let image = self.fetch_tile(&url).await?;

                let offset_x = (tile_x as f64 * tile - left).round() as i64;
                let offset_y = (tile_y as f64 * tile - top).round() as i64;
                imageops::overlay(&mut canvas, &image, offset_x, offset_y);
            }
        }

        let marker_x = (center_x - left).round() as i64 - marker_offset.0;
        let marker_y = (center_y - top).round() as i64 - marker_offset.1;
        imageops::overlay(&mut canvas, &self.marker, marker_x, marker_y);

        Ok(canvas)
    }
}

#[async_trait]
impl MapRenderer for StaticMapRenderer {
    async fn render(&self, coordinates: Coordinates) -> Result<MapImage, RenderError> {
        tracing::debug!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            zoom = self.settings.zoom,
            "Rendering map"
        );

        let canvas = self.compose(coordinates).await?;

        let mut file = tempfile::Builder::new()
            .prefix("planning-map-")
            .suffix(".png")
            .tempfile()?;

        DynamicImage::ImageRgba8(canvas)
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|e| RenderError::Image(e.to_string()))?;

        Ok(MapImage::new(file.into_temp_path()))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Renderer used when maps are turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMapRenderer;

#[async_trait]
impl MapRenderer for DisabledMapRenderer {
    async fn render(&self, _coordinates: Coordinates) -> Result<MapImage, RenderError> {
        Err(RenderError::Image("Map rendering is disabled".to_string()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Web Mercator projection to global pixel coordinates at a zoom level
fn project(coordinates: Coordinates, zoom: u8) -> (f64, f64) {
    let world = f64::from(TILE_SIZE) * f64::from(1u32 << zoom);
    let latitude = coordinates
        .latitude
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
        .to_radians();

    let x = (coordinates.longitude + 180.0) / 360.0 * world;
    let y = (1.0 - (latitude.tan() + 1.0 / latitude.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

/// A 36x30 red pin whose tip sits at (18, 30)
fn default_marker() -> RgbaImage {
    let mut icon = RgbaImage::new(36, 30);
    for (x, y, pixel) in icon.enumerate_pixels_mut() {
        let (fx, fy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
        let distance = ((fx - 18.0).powi(2) + (fy - 11.0).powi(2)).sqrt();
        let in_tail = fy >= 11.0 && (fx - 18.0).abs() <= 8.7 * (30.0 - fy) / 19.0;

        if distance <= 4.0 {
            *pixel = Rgba([255, 255, 255, 255]);
        } else if distance <= 10.0 || in_tail {
            *pixel = Rgba([214, 40, 40, 255]);
        }
    }
    icon
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tile_png(color: [u8; 4]) -> Vec<u8> {
        let tile = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(tile)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn settings(base_url: &str) -> MapSettings {
        MapSettings {
            tile_url_template: format!("{}/{{z}}/{{x}}/{{y}}.png", base_url),
            zoom: 3,
            width: 300,
            height: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_project_origin_and_edges() {
        let origin = project(
            Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            },
            0,
        );
        assert!((origin.0 - 128.0).abs() < 1e-9);
        assert!((origin.1 - 128.0).abs() < 1e-9);

        let east = project(
            Coordinates {
                latitude: 0.0,
                longitude: 180.0,
            },
            1,
        );
        assert!((east.0 - 512.0).abs() < 1e-9);

        let north = project(
            Coordinates {
                latitude: 51.5,
                longitude: 0.0,
            },
            1,
        );
        assert!(north.1 < 256.0);
    }

    #[test]
    fn test_default_marker_tip_is_bottom_centre() {
        let marker = default_marker();
        assert_eq!(marker.dimensions(), (36, 30));
        assert_eq!(marker.get_pixel(18, 11)[3], 255);
        assert_eq!(marker.get_pixel(0, 0)[3], 0);
    }

    #[tokio::test]
    async fn test_render_writes_png_and_cleans_up() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/3/\d+/\d+\.png$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(tile_png([10, 120, 200, 255]), "image/png"),
            )
            .mount(&mock_server)
            .await;

        let renderer = StaticMapRenderer::new(settings(&mock_server.uri())).unwrap();
        let image = renderer
            .render(Coordinates {
                latitude: 51.5432,
                longitude: -0.1456,
            })
            .await
            .unwrap();

        let path = image.path().to_path_buf();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (300, 200));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([10, 120, 200, 255]));
        // Marker covers the centre of the map
        assert_eq!(decoded.get_pixel(150, 100 - 19), &Rgba([255, 255, 255, 255]));

        drop(image);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_render_tile_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let renderer = StaticMapRenderer::new(settings(&mock_server.uri())).unwrap();
        let result = renderer
            .render(Coordinates {
                latitude: 51.5,
                longitude: -0.1,
            })
            .await;

        assert!(matches!(result, Err(RenderError::Tile { .. })));
    }

    #[test]
    fn test_new_rejects_out_of_range_settings() {
        let too_deep = StaticMapRenderer::new(MapSettings {
            zoom: 40,
            ..Default::default()
        });
        assert!(matches!(too_deep, Err(RenderError::Image(_))));

        let empty = StaticMapRenderer::new(MapSettings {
            width: 0,
            ..Default::default()
        });
        assert!(matches!(empty, Err(RenderError::Image(_))));

        assert!(
            StaticMapRenderer::new(MapSettings {
                zoom: MAX_ZOOM,
                ..Default::default()
            })
            .is_ok()
        );
    }

    #[tokio::test]
    async fn test_disabled_renderer() {
        let renderer = DisabledMapRenderer;
        assert!(!renderer.is_enabled());
        assert!(
            renderer
                .render(Coordinates {
                    latitude: 0.0,
                    longitude: 0.0,
                })
                .await
                .is_err()
        );
    }
}
