//! 检查表定义
//!
//! 表单由检查表驱动：每个检查项的ID对应一组表单控件（状态、时间、备注）。
//! 默认使用内建的穀倉假日巡察表，也可以从 JSON 文件载入。

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::enums::ItemCategory;
use crate::utils::error::{AppError, AppResult};

/// 单个检查项定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItemDefinition {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
}

/// 一个巡察区域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSection {
    pub area: String,
    pub items: Vec<ChecklistItemDefinition>,
}

/// 检查表，区域与检查项均有序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistDefinition {
    pub sections: Vec<ChecklistSection>,
}

fn item(id: &str, name: &str, category: ItemCategory) -> ChecklistItemDefinition {
    ChecklistItemDefinition {
        id: id.to_string(),
        name: name.to_string(),
        category,
    }
}

impl ChecklistDefinition {
    /// 内建的穀倉假日巡察表（5 区 14 项）
    pub fn grain_silo_default() -> Self {
        use ItemCategory::*;
        Self {
            sections: vec![
                ChecklistSection {
                    area: "人員管制與行政區".to_string(),
                    items: vec![
                        item("ctrl-office", "控制室/辦公大樓 (門窗、燈火檢查)", A),
                        item("security-gate", "警衛室與週遭環境 (人車進出管制紀錄)", A),
                    ],
                },
                ChecklistSection {
                    area: "碼頭區與裝卸作業".to_string(),
                    items: vec![
                        item("op-status-details", "進/出倉作業細節 (人員、機具、物料是否正常)", B),
                        item("unloader-access", "吸/卸穀機一樓樓梯門 (無作業時上鎖狀態)", B),
                        item("rail-track", "移車軌道/周邊作業區管制", B),
                        item("vessel-check", "異常船隻/人員/船邊纜繩/舷梯/防鼠盾 (若有靠船)", B),
                    ],
                },
                ChecklistSection {
                    area: "廠區設施與安全".to_string(),
                    items: vec![
                        item("road-surface", "廠區道路路面/地腳品回收區 (有無雜物、掉落物)", C),
                        item("hv-drain", "高壓配電室/地磅磅槽/周邊水溝 (積水檢查)", C),
                        item("fire-cctv", "消防受信總機系統/廠區監視系統", C),
                    ],
                },
                ChecklistSection {
                    area: "機械塔與穀倉管制".to_string(),
                    items: vec![
                        item("mech-tower-gate", "機械塔進出鐵門管制 (無作業時上鎖狀態)", D),
                        item("silo-doors", "穀倉北側/南側邊門/倉底後側通道門", D),
                        item("mech-spot-check", "機械塔檢點表 (抽檢樓層、電氣室)", D),
                    ],
                },
                ChecklistSection {
                    area: "假日施工管理".to_string(),
                    items: vec![
                        item("const-log", "廠區施工紀錄 (有無申請、地點、承商)", E),
                        item("const-safety", "作業安全裝備 (是否依規定穿著/配戴)", E),
                    ],
                },
            ],
        }
    }

    /// 从 JSON 文件载入检查表并校验
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::io_error(
                format!("读取检查表文件失败 {}: {}", path.display(), e),
                format!("{:?}", e.kind()),
            )
        })?;
        let definition: ChecklistDefinition = serde_json::from_str(&content)
            .map_err(|e| AppError::configuration_error(format!("解析检查表失败: {}", e)))?;
        definition.validate()?;
        Ok(definition)
    }

    /// 按配置载入：有路径时读文件，否则使用内建检查表
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(p) => Self::from_json_file(p),
            None => Ok(Self::grain_silo_default()),
        }
    }

    /// 校验：至少一个区域、区域不为空、检查项ID唯一、名称不为空
    pub fn validate(&self) -> AppResult<()> {
        if self.sections.is_empty() {
            return Err(AppError::configuration_error("检查表至少需要一个区域"));
        }
        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.items.is_empty() {
                return Err(AppError::configuration_error(format!(
                    "检查表区域 {} 没有任何检查项",
                    section.area
                )));
            }
            for item in &section.items {
                if item.name.trim().is_empty() || item.id.trim().is_empty() {
                    return Err(AppError::configuration_error(format!(
                        "检查表区域 {} 含有空白的检查项",
                        section.area
                    )));
                }
                if !seen.insert(item.id.as_str()) {
                    return Err(AppError::configuration_error(format!(
                        "检查项ID重复: {}",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// 扁平化后的检查项总数
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// 依序遍历 (区域, 检查项)
    pub fn iter_items(&self) -> impl Iterator<Item = (&ChecklistSection, &ChecklistItemDefinition)> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter().map(move |item| (section, item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_checklist_has_fourteen_items_in_five_areas() {
        let checklist = ChecklistDefinition::grain_silo_default();
        assert_eq!(checklist.sections.len(), 5);
        assert_eq!(checklist.total_items(), 14);
        assert!(checklist.validate().is_ok());

        let ids: Vec<&str> = checklist.iter_items().map(|(_, i)| i.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"ctrl-office"));
        assert_eq!(ids.last(), Some(&"const-safety"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut checklist = ChecklistDefinition::grain_silo_default();
        let dup = checklist.sections[0].items[0].clone();
        checklist.sections[1].items.push(dup);
        assert!(checklist.validate().is_err());
    }

    #[test]
    fn empty_section_is_rejected() {
        let checklist = ChecklistDefinition {
            sections: vec![ChecklistSection { area: "空".to_string(), items: vec![] }],
        };
        assert!(checklist.validate().is_err());
        assert!(ChecklistDefinition { sections: vec![] }.validate().is_err());
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sections":[{{"area":"碼頭","items":[{{"id":"dock","name":"碼頭巡察","category":"B"}}]}}]}}"#
        )
        .unwrap();
        let checklist = ChecklistDefinition::load(Some(file.path())).unwrap();
        assert_eq!(checklist.total_items(), 1);
        assert_eq!(checklist.sections[0].items[0].category, ItemCategory::B);
    }
}
