//! Doctor command for system diagnostics
//!
//! Provides comprehensive health checks for the facetrack environment.

use crate::bootstrap::Bootstrap;
use crate::setup::manifest::Manifest;
use crate::setup::EnvLayout;
use reqwest::Client;
use std::time::Duration;
use sysinfo::System;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Doctor diagnostics system
pub struct Doctor {
    layout: EnvLayout,
}

impl Doctor {
    /// Create a new doctor instance
    pub fn new(layout: EnvLayout) -> Self {
        Self { layout }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::new();

        checks.push(self.check_tool("ffmpeg").await);
        checks.push(self.check_tool("ffprobe").await);
        checks.push(self.check_model_assets());
        checks.push(self.check_state_dir());
        checks.push(self.check_disk_space());
        checks.push(self.check_memory());
        checks.push(self.check_network().await);
        checks.push(self.check_config());

        checks
    }

    /// Checks 1 & 2: decode tools on PATH
    async fn check_tool(&self, tool: &str) -> HealthCheck {
        let name = tool.to_string();
        match Bootstrap::probe_tool(tool).await {
            Ok(Some(_version)) => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            Ok(None) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!("{} not found on PATH", tool)),
            },
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!("Error probing {}: {}", tool, e)),
            },
        }
    }

    /// Check 3: model assets present with matching digests
    fn check_model_assets(&self) -> HealthCheck {
        let name = "Model Assets".to_string();
        let manifest = match Manifest::load(&self.layout.manifest_path) {
            Ok(manifest) => manifest,
            Err(_) => {
                return HealthCheck {
                    name,
                    status: HealthStatus::Fail(
                        "No manifest found. Run: facetrack setup".to_string(),
                    ),
                }
            }
        };

        match manifest.verify_assets(&self.layout.models_dir) {
            Ok(()) => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!("{}. Run: facetrack setup", e)),
            },
        }
    }

    /// Check 4: state directory writable
    fn check_state_dir(&self) -> HealthCheck {
        let name = "State Directory".to_string();
        if !self.layout.root.exists() {
            return HealthCheck {
                name,
                status: HealthStatus::Warn("Not provisioned. Run: facetrack setup".to_string()),
            };
        }

        // Test write permission by creating a temp file
        let test_file = self.layout.root.join(".facetrack_test");
        match std::fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_file);
                HealthCheck {
                    name,
                    status: HealthStatus::Pass,
                }
            }
            Err(_) => HealthCheck {
                name,
                status: HealthStatus::Fail("No write permission in state directory".to_string()),
            },
        }
    }

    /// Check 5: disk space
    fn check_disk_space(&self) -> HealthCheck {
        use sysinfo::Disks;
        let disks = Disks::new_with_refreshed_list();
        let name = "Disk Space".to_string();

        // Find disk containing the state directory
        for disk in &disks {
            if self.layout.root.starts_with(disk.mount_point()) {
                let available_gb = disk.available_space() / (1024 * 1024 * 1024);

                return if available_gb < 1 {
                    HealthCheck {
                        name,
                        status: HealthStatus::Fail(format!(
                            "Less than 1GB available ({} GB)",
                            available_gb
                        )),
                    }
                } else if available_gb < 5 {
                    HealthCheck {
                        name,
                        status: HealthStatus::Warn(format!(
                            "Low disk space ({} GB available)",
                            available_gb
                        )),
                    }
                } else {
                    HealthCheck {
                        name,
                        status: HealthStatus::Pass,
                    }
                };
            }
        }

        HealthCheck {
            name,
            status: HealthStatus::Warn("Could not determine disk space".to_string()),
        }
    }

    /// Check 6: memory availability
    fn check_memory(&self) -> HealthCheck {
        let mut sys = System::new_all();
        sys.refresh_memory();
        let name = "Memory".to_string();

        let available_gb = sys.available_memory() / (1024 * 1024 * 1024);

        if available_gb < 1 {
            HealthCheck {
                name,
                status: HealthStatus::Fail(format!(
                    "Less than 1GB RAM available ({} GB)",
                    available_gb
                )),
            }
        } else if available_gb < 2 {
            HealthCheck {
                name,
                status: HealthStatus::Warn(format!("Low memory ({} GB available)", available_gb)),
            }
        } else {
            HealthCheck {
                name,
                status: HealthStatus::Pass,
            }
        }
    }

    /// Check 7: model host reachable
    async fn check_network(&self) -> HealthCheck {
        let name = "Network".to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        match client.get("https://huggingface.co").send().await {
            Ok(response) if response.status().is_success() => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            _ => HealthCheck {
                name,
                status: HealthStatus::Warn(
                    "Cannot reach model host (downloads will fail)".to_string(),
                ),
            },
        }
    }

    /// Check 8: configuration parses
    fn check_config(&self) -> HealthCheck {
        let name = "Configuration".to_string();
        let config_path = self.layout.root.join("config.toml");

        if !config_path.exists() {
            return HealthCheck {
                name,
                status: HealthStatus::Pass,
            };
        }

        match std::fs::read_to_string(&config_path)
            .map_err(|e| e.to_string())
            .and_then(|c| toml::from_str::<crate::config::Config>(&c).map_err(|e| e.to_string()))
        {
            Ok(_) => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Warn(format!("Config does not parse: {}", e)),
            },
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 facetrack System Diagnostics\n");
        println!("{:<20} {}", "Check", "Status");
        println!("{}", "=".repeat(50));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "✅ PASS".to_string(),
                HealthStatus::Warn(msg) => format!("⚠️  WARN: {}", msg),
                HealthStatus::Fail(msg) => format!("❌ FAIL: {}", msg),
            };

            println!("{:<20} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}
