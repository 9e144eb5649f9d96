// 声明 entities 模块下的所有实体

pub mod inspection_record;
