// ==========================================
// 工厂设备维护管理 - 资产类型参数包络注册表
// ==========================================
// 职责: 资产类型 → 监测参数（有序）及其运行包络
// 来源: 内置五类设备画像；可由 config_kv 的 asset_profiles (JSON) 整体覆盖
// 红线: 启动时构建，运行期只读
// ==========================================

use crate::domain::profile::{AssetProfile, ParameterEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===== 内置设备画像 =====

fn heavy_rotating() -> AssetProfile {
    AssetProfile::new(vec![
        ParameterEnvelope::new("vibracao", 0.0, 5.0, 1.5, 2.0),
        ParameterEnvelope::new("temperatura", 40.0, 100.0, 1.1, 1.2),
    ])
}

fn light_rotating() -> AssetProfile {
    AssetProfile::new(vec![
        ParameterEnvelope::new("vibracao", 0.0, 3.0, 1.5, 2.2),
        ParameterEnvelope::new("temperatura", 30.0, 80.0, 1.1, 1.25),
    ])
}

fn thermal_process() -> AssetProfile {
    AssetProfile::new(vec![
        ParameterEnvelope::new("pressao", 5.0, 25.0, 1.2, 1.5),
        ParameterEnvelope::new("temperatura", 150.0, 300.0, 1.15, 1.25),
    ])
}

fn hydraulic_process() -> AssetProfile {
    AssetProfile::new(vec![
        ParameterEnvelope::new("pressao", 100.0, 200.0, 1.1, 1.2),
        ParameterEnvelope::new("vazao_oleo", 30.0, 50.0, 1.2, 1.4),
    ])
}

fn electronic() -> AssetProfile {
    AssetProfile::new(vec![
        ParameterEnvelope::new("temperatura", 25.0, 75.0, 1.1, 1.2),
        ParameterEnvelope::new("corrente_eletrica", 1.0, 10.0, 1.5, 2.0),
    ])
}

/// 内置资产类型清单（类型名, 画像构造函数）
const BUILTIN_TYPES: [(&str, fn() -> AssetProfile); 30] = [
    ("Torno CNC", heavy_rotating),
    ("Fresadora", heavy_rotating),
    ("Compressor de Ar Industrial", hydraulic_process),
    ("Prensa Hidráulica", hydraulic_process),
    ("Caldeira a Vapor", thermal_process),
    ("Gerador de Energia a Diesel", heavy_rotating),
    ("Robô de Soldagem", electronic),
    ("Esteira Transportadora", light_rotating),
    ("Empilhadeira", light_rotating),
    ("Trocador de Calor", thermal_process),
    ("Bomba Centrífuga", light_rotating),
    ("Forno de Indução", thermal_process),
    ("Misturador Industrial", heavy_rotating),
    ("Reator Químico", thermal_process),
    ("Máquina de Injeção de Plástico", hydraulic_process),
    ("Sistema de Filtração Industrial", hydraulic_process),
    ("Célula de Carga", electronic),
    ("Ponte Rolante", heavy_rotating),
    ("Extrusora", hydraulic_process),
    ("CLP", electronic),
    ("Máquina de Corte a Laser", thermal_process),
    ("Dobradeira de Chapas", hydraulic_process),
    ("Torre de Resfriamento", thermal_process),
    ("Moinho de Bolas", heavy_rotating),
    ("Secador Industrial", thermal_process),
    ("Guilhotina Industrial", hydraulic_process),
    ("Autoclave Industrial", thermal_process),
    ("Sistema de Visão Computacional", electronic),
    ("Chiller Industrial", thermal_process),
    ("Silo de Armazenamento", hydraulic_process),
];

// ==========================================
// ProfileRegistry - 画像注册表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, AssetProfile>,
}

impl ProfileRegistry {
    /// 由给定映射构建（逐参数校验系数关系）
    pub fn new(profiles: BTreeMap<String, AssetProfile>) -> Result<Self, String> {
        for (asset_type, profile) in &profiles {
            if profile.params.is_empty() {
                return Err(format!("资产类型{}未声明任何监测参数", asset_type));
            }
            for p in &profile.params {
                p.validate()
                    .map_err(|e| format!("资产类型{}: {}", asset_type, e))?;
            }
        }
        Ok(Self { profiles })
    }

    /// 内置注册表
    pub fn builtin() -> Self {
        let profiles = BUILTIN_TYPES
            .iter()
            .map(|(name, build)| (name.to_string(), build()))
            .collect();
        Self { profiles }
    }

    /// 从 JSON 构建
    ///
    /// 格式: {"Torno CNC": {"params": [{"name": "vibracao", "op_min": 0, ...}, ...]}, ...}
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let profiles: BTreeMap<String, AssetProfile> =
            serde_json::from_str(raw).map_err(|e| format!("asset_profiles 解析失败: {}", e))?;
        Self::new(profiles)
    }

    pub fn get(&self, asset_type: &str) -> Option<&AssetProfile> {
        self.profiles.get(asset_type)
    }

    pub fn contains(&self, asset_type: &str) -> bool {
        self.profiles.contains_key(asset_type)
    }

    /// 全部资产类型（字典序）
    pub fn asset_types(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
